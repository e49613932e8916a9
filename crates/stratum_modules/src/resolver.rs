//! Module resolution against a required contract.
//!
//! The resolver handles:
//! - Source presence and `org/name` format checks
//! - Module lookup and contract classification
//! - Version lookup, with `latest` following the module's latest pointer

use stratum_config::{ValidationErrorKind, DEFAULT_MODULE_VERSION};
use tracing::debug;

use crate::contract::{ContractParseError, ModuleContractName};
use crate::error::ResolveModuleError;
use crate::module::{Module, ModuleVersion};
use crate::registry::ModuleRegistry;
use crate::source::ModuleSource;

/// A module and version that satisfied a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub source: ModuleSource,
    pub module: Module,
    pub version: ModuleVersion,
}

/// Resolves module references through a [`ModuleRegistry`].
pub struct ModuleResolver<'a> {
    registry: &'a dyn ModuleRegistry,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(registry: &'a dyn ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `source@version` and check it against `required_contract`.
    ///
    /// Configuration problems come back as [`ResolveModuleError::Invalid`];
    /// lookup failures as [`ResolveModuleError::Resolver`].
    pub fn resolve(
        &self,
        source: &str,
        version: &str,
        required_contract: &str,
    ) -> Result<ResolvedModule, ResolveModuleError> {
        if source.trim().is_empty() {
            return Err(ResolveModuleError::Invalid(
                ValidationErrorKind::RequiredModule,
            ));
        }

        let parsed: ModuleSource = source.parse().map_err(ResolveModuleError::Invalid)?;

        let module = self
            .registry
            .get_module(&parsed.org_name, &parsed.module_name)?
            .ok_or_else(|| {
                ResolveModuleError::Invalid(ValidationErrorKind::MissingModule {
                    source_ref: source.to_string(),
                })
            })?;

        let pattern: ModuleContractName = required_contract.parse().map_err(|e: ContractParseError| {
            ResolveModuleError::Invalid(ValidationErrorKind::MalformedContract {
                contract: e.contract,
                reason: e.reason,
            })
        })?;
        let actual = module.contract_name();
        if !pattern.matches(&actual) {
            return Err(ResolveModuleError::Invalid(
                ValidationErrorKind::InvalidModuleContract {
                    source_ref: source.to_string(),
                    expected: required_contract.to_string(),
                    actual: actual.to_string(),
                },
            ));
        }

        let version = self.resolve_version(&parsed, &module, source, version)?;
        debug!(
            "Resolved module {}@{} ({})",
            parsed, version.version, actual
        );

        Ok(ResolvedModule {
            source: parsed,
            module,
            version,
        })
    }

    fn resolve_version(
        &self,
        parsed: &ModuleSource,
        module: &Module,
        source: &str,
        version: &str,
    ) -> Result<ModuleVersion, ResolveModuleError> {
        let missing = || {
            ResolveModuleError::Invalid(ValidationErrorKind::MissingModuleVersion {
                source_ref: source.to_string(),
                version: version.to_string(),
            })
        };

        let wanted = if version.is_empty() || version == DEFAULT_MODULE_VERSION {
            module.latest_version.as_deref()
        } else {
            Some(version)
        };
        let Some(wanted) = wanted else {
            return Err(missing());
        };

        self.registry
            .get_module_version(&parsed.org_name, &parsed.module_name, wanted)?
            .ok_or_else(missing)
    }
}
