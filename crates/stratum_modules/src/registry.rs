//! Module lookup interface.

use crate::error::ResolverError;
use crate::module::{Module, ModuleVersion};

/// Source of module metadata, typically backed by a remote catalog API.
///
/// Lookups return `Ok(None)` when the module or version does not exist and
/// `Err` only when the lookup itself failed. Implementations must not retry;
/// retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ModuleRegistry {
    /// Fetch a module by org and name.
    fn get_module(&self, org_name: &str, module_name: &str) -> Result<Option<Module>, ResolverError>;

    /// Fetch one explicit version of a module.
    fn get_module_version(
        &self,
        org_name: &str,
        module_name: &str,
        version: &str,
    ) -> Result<Option<ModuleVersion>, ResolverError>;
}
