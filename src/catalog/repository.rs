//! Repository seam for catalog persistence operations.
//!
//! The grouper and promoter depend on this trait rather than on [`Catalog`]
//! directly, so the pipeline stages only see the store operations they use.

use async_trait::async_trait;

use super::{
    BinaryUpsert, BinaryWithParts, Catalog, ConsumedRows, Group, NewRelease, Part, ReadyBinary,
    Release, Result,
};

/// Data-access contract for the indexing pipeline.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Returns every part whose binary reference is unset.
    async fn ungrouped_parts(&self) -> Result<Vec<Part>>;

    /// Upserts a binary by hash and attaches the part to it.
    async fn save_binary(&self, binary: &BinaryUpsert<'_>, part_id: i64) -> Result<i64>;

    /// Returns binaries meeting the completeness threshold, newest first.
    async fn find_ready_binaries(&self, threshold: f64) -> Result<Vec<ReadyBinary>>;

    /// Loads a binary with parts and segments populated.
    async fn load_binary(&self, id: i64) -> Result<Option<BinaryWithParts>>;

    /// Resolves a newsgroup by name.
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>>;

    /// Looks up a release by (name, posted).
    async fn find_release(&self, name: &str, posted: i64) -> Result<Option<Release>>;

    /// Inserts a release and deletes the source binary's rows atomically.
    async fn create_release_consuming(&self, release: &NewRelease, binary_id: i64)
    -> Result<i64>;

    /// Deletes a binary and its parts/segments atomically.
    async fn discard_binary(&self, binary_id: i64) -> Result<ConsumedRows>;
}

#[async_trait]
impl CatalogRepository for Catalog {
    async fn ungrouped_parts(&self) -> Result<Vec<Part>> {
        Catalog::ungrouped_parts(self).await
    }

    async fn save_binary(&self, binary: &BinaryUpsert<'_>, part_id: i64) -> Result<i64> {
        Catalog::save_binary(self, binary, part_id).await
    }

    async fn find_ready_binaries(&self, threshold: f64) -> Result<Vec<ReadyBinary>> {
        Catalog::find_ready_binaries(self, threshold).await
    }

    async fn load_binary(&self, id: i64) -> Result<Option<BinaryWithParts>> {
        Catalog::load_binary(self, id).await
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Catalog::find_group_by_name(self, name).await
    }

    async fn find_release(&self, name: &str, posted: i64) -> Result<Option<Release>> {
        Catalog::find_release(self, name, posted).await
    }

    async fn create_release_consuming(
        &self,
        release: &NewRelease,
        binary_id: i64,
    ) -> Result<i64> {
        Catalog::create_release_consuming(self, release, binary_id).await
    }

    async fn discard_binary(&self, binary_id: i64) -> Result<ConsumedRows> {
        Catalog::discard_binary(self, binary_id).await
    }
}

/// Store wrapper that fails chosen calls, for exercising error paths.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::{CatalogError, DbErrorKind};

    /// Counts calls to one operation and fails the Nth (1-based) one.
    #[derive(Debug, Default)]
    pub(crate) struct Fault {
        fail_on: Option<(usize, DbErrorKind)>,
        calls: AtomicUsize,
    }

    impl Fault {
        fn hit(&self) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_on {
                Some((n, kind)) if n == call => Err(CatalogError::Database {
                    kind,
                    message: format!("injected failure on call {call}"),
                }),
                _ => Ok(()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Delegates to a real [`Catalog`]; a failing call never reaches it.
    #[derive(Debug)]
    pub(crate) struct FaultyCatalog {
        inner: Catalog,
        pub(crate) save_binary: Fault,
        pub(crate) create_release: Fault,
    }

    impl FaultyCatalog {
        pub(crate) fn new(inner: Catalog) -> Self {
            Self {
                inner,
                save_binary: Fault::default(),
                create_release: Fault::default(),
            }
        }

        pub(crate) fn fail_save_binary_on(mut self, call: usize, kind: DbErrorKind) -> Self {
            self.save_binary.fail_on = Some((call, kind));
            self
        }

        pub(crate) fn fail_create_release_on(mut self, call: usize, kind: DbErrorKind) -> Self {
            self.create_release.fail_on = Some((call, kind));
            self
        }

        pub(crate) fn inner(&self) -> &Catalog {
            &self.inner
        }
    }

    #[async_trait]
    impl CatalogRepository for FaultyCatalog {
        async fn ungrouped_parts(&self) -> Result<Vec<Part>> {
            self.inner.ungrouped_parts().await
        }

        async fn save_binary(&self, binary: &BinaryUpsert<'_>, part_id: i64) -> Result<i64> {
            self.save_binary.hit()?;
            self.inner.save_binary(binary, part_id).await
        }

        async fn find_ready_binaries(&self, threshold: f64) -> Result<Vec<ReadyBinary>> {
            self.inner.find_ready_binaries(threshold).await
        }

        async fn load_binary(&self, id: i64) -> Result<Option<BinaryWithParts>> {
            self.inner.load_binary(id).await
        }

        async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
            self.inner.find_group_by_name(name).await
        }

        async fn find_release(&self, name: &str, posted: i64) -> Result<Option<Release>> {
            self.inner.find_release(name, posted).await
        }

        async fn create_release_consuming(
            &self,
            release: &NewRelease,
            binary_id: i64,
        ) -> Result<i64> {
            self.create_release.hit()?;
            self.inner.create_release_consuming(release, binary_id).await
        }

        async fn discard_binary(&self, binary_id: i64) -> Result<ConsumedRows> {
            self.inner.discard_binary(binary_id).await
        }
    }
}
