//! `go build` argument assembly.

use serde::{Deserialize, Serialize};

/// Where `go build` writes the binary inside the container.
pub const BINARY_PATH: &str = "/work/out/binary";

/// Options for a single build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Package to compile; the whole module when unset.
    pub pkg: Option<String>,
    /// Extra build tags, in the order given.
    pub tags: Vec<String>,
    /// Remove file system paths from the binary.
    pub trimpath: bool,
    /// Arguments appended verbatim before the package.
    pub raw_args: Vec<String>,
    /// Target platform, `os/arch[/variant]`.
    pub platform: Option<String>,
}

impl BuildOptions {
    pub fn new() -> Self {
        BuildOptions::default()
    }

    pub fn pkg(mut self, pkg: impl Into<String>) -> Self {
        self.pkg = Some(pkg.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn trimpath(mut self, trimpath: bool) -> Self {
        self.trimpath = trimpath;
        self
    }

    pub fn raw_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// The `go build` command line for these options.
    ///
    /// Token order is fixed: output flag, tags, `-trimpath`, raw args, then
    /// the package. Tags are joined as given, never sorted or deduplicated.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["go", "build", "-o", BINARY_PATH]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if !self.tags.is_empty() {
            args.push("-tags".to_string());
            args.push(self.tags.join(","));
        }

        if self.trimpath {
            args.push("-trimpath".to_string());
        }

        args.extend(self.raw_args.iter().cloned());

        if let Some(pkg) = self.pkg.as_deref().filter(|p| !p.is_empty()) {
            args.push(pkg.to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_args() {
        assert_eq!(
            BuildOptions::new().build_args(),
            vec!["go", "build", "-o", BINARY_PATH]
        );
    }

    #[test]
    fn test_full_args_order() {
        let opts = BuildOptions::new()
            .pkg("./cmd/server")
            .tags(["b", "a"])
            .trimpath(true)
            .raw_args(["-ldflags", "-s -w"]);

        assert_eq!(
            opts.build_args(),
            vec![
                "go",
                "build",
                "-o",
                BINARY_PATH,
                "-tags",
                "b,a",
                "-trimpath",
                "-ldflags",
                "-s -w",
                "./cmd/server",
            ]
        );
    }

    #[test]
    fn test_tags_keep_duplicates_and_order() {
        let args = BuildOptions::new().tags(["z", "a", "z"]).build_args();
        assert_eq!(args[5], "z,a,z");
    }

    #[test]
    fn test_empty_pkg_omitted() {
        let args = BuildOptions::new().pkg("").build_args();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let opts = BuildOptions::new().pkg(".").tags(["netgo"]).trimpath(true);
        assert_eq!(opts.build_args(), opts.build_args());
        assert_eq!(opts.clone().build_args(), opts.build_args());
    }
}
