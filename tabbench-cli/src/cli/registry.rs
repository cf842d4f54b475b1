//! Name-to-generator registry.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use tabbench_core::{Dataset, Device};

use super::commands::CliError;
use super::generators::{blobs, load};

/// Generator run when the command line names none.
pub const DEFAULT_GENERATOR: &str = "blobs";

/// A dataset generator.
///
/// Receives the device, the arguments following the generator keyword and a
/// writer for usage output. `Ok(None)` means usage was printed and nothing
/// was allocated.
pub type GeneratorFn<D> =
    fn(&D, &[String], &mut dyn Write) -> Result<Option<Dataset<D>>, CliError>;

/// Ordered map from generator names to generator functions.
///
/// # Examples
/// ```
/// use tabbench_cli::cli::{CliError, Registry};
/// use tabbench_core::HostDevice;
///
/// let registry = Registry::<HostDevice>::new();
/// assert_eq!(registry.available(), "blobs|load");
/// assert!(matches!(
///     registry.resolve("moons"),
///     Err(CliError::UnknownGenerator { .. })
/// ));
/// ```
pub struct Registry<D: Device> {
    generators: BTreeMap<&'static str, GeneratorFn<D>>,
}

impl<D: Device> Registry<D> {
    /// Creates a registry holding the built-in `blobs` and `load` generators.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("blobs", blobs::<D>);
        registry.register("load", load::<D>);
        registry
    }

    /// Creates a registry without any generators.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Registers `generator` under `name`, returning any generator it replaces.
    pub fn register(
        &mut self,
        name: &'static str,
        generator: GeneratorFn<D>,
    ) -> Option<GeneratorFn<D>> {
        self.generators.insert(name, generator)
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Iterates over the registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    /// Returns the registered names joined with `|`.
    #[must_use]
    pub fn available(&self) -> String {
        self.names().collect::<Vec<_>>().join("|")
    }

    /// Looks up the generator registered under `name`.
    ///
    /// # Errors
    /// Returns [`CliError::UnknownGenerator`] listing the available names when
    /// `name` is not registered.
    pub fn resolve(&self, name: &str) -> Result<GeneratorFn<D>, CliError> {
        self.generators
            .get(name)
            .copied()
            .ok_or_else(|| CliError::UnknownGenerator {
                name: name.to_owned(),
                available: self.available(),
            })
    }

    /// Returns the index of the first argument that names a registered
    /// generator, or `args.len()` when none does.
    ///
    /// Every argument is considered, including option values, so a file
    /// literally named `load` is taken as the keyword.
    #[must_use]
    pub fn find_generator_start(&self, args: &[String]) -> usize {
        args.iter()
            .position(|arg| self.contains(arg))
            .unwrap_or(args.len())
    }
}

impl<D: Device> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
