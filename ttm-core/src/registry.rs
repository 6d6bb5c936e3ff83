//! Method registries: name → capability, resolved lazily.
//!
//! Provider crates build one registry per stage kind behind a `OnceLock`, so
//! nothing is constructed until a method is requested. A registered method is
//! either available, in which case its factory parses the method's own
//! arguments, or unavailable because its backend is not part of this build.

use std::collections::HashMap;
use std::ffi::OsString;

use clap::Parser;

use crate::error::{DependencyError, Result, TtmError};

/// Builds a method instance from its command-line arguments.
pub type Factory<T> = fn(&[String]) -> Result<T>;

/// Whether a registered method can be constructed in this build.
pub enum Capability<T> {
    /// The method can be built with this factory.
    Available(Factory<T>),
    /// The method needs a backend that is not compiled in.
    Unavailable {
        /// Name of the missing backend.
        dependency: &'static str,
    },
}

impl<T> std::fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Available"),
            Self::Unavailable { dependency } => f
                .debug_struct("Unavailable")
                .field("dependency", dependency)
                .finish(),
        }
    }
}

/// Registry of methods for one stage kind.
#[derive(Debug)]
pub struct MethodRegistry<T> {
    kind: &'static str,
    methods: HashMap<&'static str, Capability<T>>,
}

impl<T> MethodRegistry<T> {
    /// Create an empty registry for stage `kind`.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            methods: HashMap::new(),
        }
    }

    /// Register an available method.
    #[must_use]
    pub fn with(mut self, name: &'static str, factory: Factory<T>) -> Self {
        self.methods.insert(name, Capability::Available(factory));
        self
    }

    /// Register a method whose backend is missing from this build.
    #[must_use]
    pub fn with_unavailable(mut self, name: &'static str, dependency: &'static str) -> Self {
        self.methods
            .insert(name, Capability::Unavailable { dependency });
        self
    }

    /// Stage kind served by this registry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether `name` is registered, available or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered names in alphabetical order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Split a command line into method invocations.
    ///
    /// A new invocation starts at every registered method name, unless the
    /// preceding word is an option awaiting its value (`--init random`).
    /// Everything in between belongs to the preceding method as its
    /// arguments.
    ///
    /// # Errors
    /// Returns [`DependencyError::UnknownMethod`] when the first word is not a
    /// registered method, and [`TtmError::Config`] when `words` is empty.
    pub fn split_invocations(&self, words: &[String]) -> Result<Vec<Invocation>> {
        let (first, rest) = self.leading_method(words)?;
        let mut invocations = vec![Invocation::new(first)];
        let mut awaiting_value = false;
        for word in rest {
            match invocations.last_mut() {
                Some(current) if awaiting_value || !self.contains(word) => {
                    current.args.push(word.clone());
                }
                _ => invocations.push(Invocation::new(word)),
            }
            awaiting_value = expects_value(word);
        }
        Ok(invocations)
    }

    /// Read a command line holding exactly one method.
    ///
    /// Every word after the method name is passed to it verbatim, so option
    /// values that happen to name other methods stay arguments.
    ///
    /// # Errors
    /// Returns [`DependencyError::UnknownMethod`] when the first word is not a
    /// registered method, and [`TtmError::Config`] when `words` is empty.
    pub fn single_invocation(&self, words: &[String]) -> Result<Invocation> {
        let (first, rest) = self.leading_method(words)?;
        Ok(Invocation {
            method: first.clone(),
            args: rest.to_vec(),
        })
    }

    fn leading_method<'w>(&self, words: &'w [String]) -> Result<(&'w String, &'w [String])> {
        let Some((first, rest)) = words.split_first() else {
            return Err(TtmError::config(self.kind, "no METHOD given"));
        };
        if !self.contains(first) {
            return Err(DependencyError::UnknownMethod {
                kind: self.kind,
                method: first.clone(),
            }
            .into());
        }
        Ok((first, rest))
    }

    /// Build every invocation in order.
    ///
    /// # Errors
    /// See [`MethodRegistry::resolve`].
    pub fn resolve_all(&self, invocations: &[Invocation]) -> Result<Vec<(String, T)>> {
        invocations
            .iter()
            .map(|invocation| {
                self.resolve(&invocation.method, &invocation.args)
                    .map(|built| (invocation.describe(), built))
            })
            .collect()
    }

    /// Look up `name` and build it from `args`.
    ///
    /// # Errors
    /// Returns [`DependencyError::UnknownMethod`] for unregistered names,
    /// [`DependencyError::Unavailable`] for methods without a backend, and
    /// whatever the factory returns for bad arguments.
    pub fn resolve(&self, name: &str, args: &[String]) -> Result<T> {
        match self.methods.get(name) {
            Some(Capability::Available(factory)) => factory(args),
            Some(Capability::Unavailable { dependency }) => Err(DependencyError::Unavailable {
                kind: self.kind,
                method: name.to_owned(),
                dependency: *dependency,
            }
            .into()),
            None => Err(DependencyError::UnknownMethod {
                kind: self.kind,
                method: name.to_owned(),
            }
            .into()),
        }
    }
}

/// One method name with the arguments that followed it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    /// Registered method name.
    pub method: String,
    /// Arguments for the method's own parser.
    pub args: Vec<String>,
}

impl Invocation {
    fn new(method: &str) -> Self {
        Self {
            method: method.to_owned(),
            args: Vec::new(),
        }
    }

    /// Method and arguments as typed, for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        std::iter::once(self.method.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Whether `word` is an option whose value is the next word.
///
/// Method options all take values, so a bare `--name` or short `-n` waits for
/// one; `--name=value` and plain values do not.
fn expects_value(word: &str) -> bool {
    word.len() > 1 && word.starts_with('-') && !word.contains('=') && word.parse::<f64>().is_err()
}

/// Parse method arguments with a clap-derived options struct.
///
/// # Errors
/// Returns [`TtmError::Config`] carrying clap's diagnostic.
///
/// # Examples
/// ```
/// use clap::Parser;
/// use ttm_core::parse_method_args;
///
/// #[derive(Parser)]
/// struct LimitArgs {
///     #[arg(long, default_value_t = 10)]
///     limit: usize,
/// }
///
/// let args: LimitArgs = parse_method_args("tfidf", &["--limit".into(), "3".into()])?;
/// assert_eq!(args.limit, 3);
/// # Ok::<(), ttm_core::TtmError>(())
/// ```
pub fn parse_method_args<P: Parser>(method: &str, args: &[String]) -> Result<P> {
    let argv = std::iter::once(OsString::from(method)).chain(args.iter().map(OsString::from));
    P::try_parse_from(argv).map_err(|err| TtmError::config(method, err.to_string().trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn build_constant(args: &[String]) -> Result<usize> {
        Ok(args.len())
    }

    fn registry() -> MethodRegistry<usize> {
        MethodRegistry::new("embed")
            .with("count", build_constant)
            .with_unavailable("doc2vec", "gensim")
    }

    #[test]
    fn resolves_available_methods() -> Result<()> {
        let built = registry().resolve("count", &["a".into(), "b".into()])?;
        assert_eq!(built, 2);
        Ok(())
    }

    #[rstest]
    #[case("doc2vec", "DEPENDENCY_UNAVAILABLE")]
    #[case("word2vec", "DEPENDENCY_UNKNOWN_METHOD")]
    fn missing_capabilities_are_dependency_errors(#[case] method: &str, #[case] code: &str) {
        let err = registry()
            .resolve(method, &[])
            .expect_err("method must not resolve");
        assert_eq!(err.detail_code(), Some(code));
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(registry().names(), vec!["count", "doc2vec"]);
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn splits_invocations_at_registered_names() -> Result<()> {
        let invocations = registry().split_invocations(&words("count --a 1 doc2vec count"))?;
        let described: Vec<_> = invocations.iter().map(Invocation::describe).collect();
        assert_eq!(described, vec!["count --a 1", "doc2vec", "count"]);
        Ok(())
    }

    #[test]
    fn option_values_naming_methods_stay_arguments() -> Result<()> {
        let invocations =
            registry().split_invocations(&words("count --mode doc2vec --n=1 count -k count"))?;
        let described: Vec<_> = invocations.iter().map(Invocation::describe).collect();
        assert_eq!(described, vec!["count --mode doc2vec --n=1", "count -k count"]);
        Ok(())
    }

    #[test]
    fn single_invocation_keeps_every_word_as_an_argument() -> Result<()> {
        let invocation = registry().single_invocation(&words("count --init doc2vec count"))?;
        assert_eq!(invocation.method, "count");
        assert_eq!(invocation.args, words("--init doc2vec count"));
        Ok(())
    }

    #[rstest]
    #[case("", "TTM_CONFIG")]
    #[case("kmeans --init count", "TTM_DEPENDENCY")]
    fn single_invocation_needs_a_leading_method(#[case] line: &str, #[case] code: &str) {
        let err = registry()
            .single_invocation(&words(line))
            .expect_err("a registered method must come first");
        assert_eq!(err.code().as_str(), code);
    }

    #[rstest]
    #[case("", "TTM_CONFIG")]
    #[case("--a 1 count", "TTM_DEPENDENCY")]
    fn rejects_command_lines_without_a_leading_method(#[case] line: &str, #[case] code: &str) {
        let err = registry()
            .split_invocations(&words(line))
            .expect_err("a method must come first");
        assert_eq!(err.code().as_str(), code);
    }

    #[test]
    fn resolve_all_keeps_command_line_order() -> Result<()> {
        let reg = registry();
        let built = reg.resolve_all(&reg.split_invocations(&words("count x y count"))?)?;
        assert_eq!(built, vec![("count x y".to_owned(), 2), ("count".to_owned(), 0)]);
        Ok(())
    }

    #[derive(Debug, Parser)]
    struct ExampleArgs {
        #[arg(long, default_value_t = 5)]
        components: usize,
    }

    #[test]
    fn bad_arguments_are_config_errors() {
        let err = parse_method_args::<ExampleArgs>("svd", &["--bogus".into()])
            .expect_err("unknown flag must fail");
        assert!(matches!(err, TtmError::Config { ref method, .. } if method == "svd"));
    }

    #[test]
    fn defaults_apply_without_arguments() -> Result<()> {
        let args: ExampleArgs = parse_method_args("svd", &[])?;
        assert_eq!(args.components, 5);
        Ok(())
    }
}
