//! Environment variable bookkeeping and `$VAR` expansion for engines.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable reference pattern is valid")
});

/// Replace `${NAME}` and `$NAME` references using `lookup`.
///
/// Unknown names expand to the empty string. Expansion is single-pass:
/// substituted text is not scanned again.
pub fn expand_vars<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_REF
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

/// An ordered set of environment variables as an engine applies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: Vec<(String, String)>,
}

impl EnvVars {
    pub fn new() -> Self {
        EnvVars { vars: Vec::new() }
    }

    /// Seed from `NAME=value` entries (as found in image configs).
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = EnvVars::new();
        for entry in entries {
            if let Some((name, value)) = entry.as_ref().split_once('=') {
                env.set(name, value, false);
            }
        }
        env
    }

    /// Set a variable, expanding `value` against the current contents first
    /// when `expand` is true.
    pub fn set(&mut self, name: &str, value: &str, expand: bool) {
        let value = if expand {
            expand_vars(value, |n| self.get(n).map(str::to_string))
        } else {
            value.to_string()
        };

        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Expand references in `value` against the current contents.
    pub fn expand(&self, value: &str) -> String {
        expand_vars(value, |n| self.get(n).map(str::to_string))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_both_forms() {
        let env = EnvVars::from_entries(["PATH=/usr/bin", "HOME=/root"]);
        assert_eq!(env.expand("/opt/bin:$PATH"), "/opt/bin:/usr/bin");
        assert_eq!(env.expand("${HOME}/go"), "/root/go");
        assert_eq!(env.expand("$MISSING-x"), "-x");
        assert_eq!(env.expand("no refs"), "no refs");
    }

    #[test]
    fn test_expand_is_single_pass() {
        let mut env = EnvVars::new();
        env.set("A", "$B", false);
        env.set("B", "b", false);
        assert_eq!(env.expand("$A"), "$B");
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut env = EnvVars::new();
        env.set("A", "1", false);
        env.set("B", "2", false);
        env.set("A", "3", false);

        let vars: Vec<_> = env.iter().collect();
        assert_eq!(vars, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn test_set_expand_uses_current_values() {
        let mut env = EnvVars::from_entries(["PATH=/usr/bin"]);
        env.set("PATH", "/go/bin:$PATH", true);
        assert_eq!(env.get("PATH"), Some("/go/bin:/usr/bin"));
    }
}
