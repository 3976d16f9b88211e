use crate::error::ClusterResult;
use crate::list::ClusterList;
use crate::metric::FrameDistance;

/// A clustering method that partitions the frames held by a [`ClusterList`].
///
/// `cluster` sees only the frames selected by the sieve (those in the
/// distance matrix). `add_sieved_frames` then places the frames the sieve
/// left out; the default records each one's nearest selected frame so that
/// [`ClusterList::finalize`] can fold it into the owner of that frame.
pub trait ClusteringAlgorithm {
    fn name(&self) -> &'static str;

    /// One-line parameter summary for reports.
    fn info(&self) -> String;

    fn cluster(&self, list: &mut ClusterList) -> ClusterResult<()>;

    fn add_sieved_frames(
        &self,
        list: &mut ClusterList,
        dist: &dyn FrameDistance,
    ) -> ClusterResult<()> {
        list.assign_remainder(dist)
    }
}
