//! Target platform parsing.
//!
//! Platforms are written as `os/arch[/variant]` (e.g. `linux/arm64/v7`,
//! `windows/amd64`). Tokens are normalized the way container tooling does:
//! lowercased, with common architecture aliases folded into their Go names
//! (`x86_64` becomes `amd64`, `aarch64` becomes `arm64`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Operating systems accepted as the first platform segment.
const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Architectures accepted as the second platform segment (after normalization).
const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// A parsed cross-compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (linux, darwin, windows, ...)
    pub os: String,
    /// CPU architecture in Go naming (amd64, arm64, arm, ...)
    pub arch: String,
    /// Architecture variant, e.g. the ARM revision (`v7`)
    pub variant: Option<String>,
}

impl Platform {
    /// Create a platform from already-normalized parts.
    pub fn new(os: &str, arch: &str, variant: Option<&str>) -> Self {
        Platform {
            os: os.to_string(),
            arch: arch.to_string(),
            variant: variant.map(|v| v.to_string()),
        }
    }

    /// Parse a platform string.
    ///
    /// An empty string is not an error: it yields `Ok(None)`, meaning
    /// "no platform requested". Anything else must have two or three
    /// non-empty segments with a known OS and architecture.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        if s.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(Error::parse(
                s,
                format!(
                    "expected `os/arch[/variant]`, found {} segment(s)",
                    parts.len()
                ),
            ));
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::parse(s, "platform segments must not be empty"));
        }

        let os = normalize_os(parts[0]);
        if !KNOWN_OS.contains(&os.as_str()) {
            return Err(Error::parse(s, format!("unknown operating system `{}`", parts[0])));
        }

        let (arch, mut variant) = normalize_arch(parts[1], parts.get(2).copied());
        if !KNOWN_ARCH.contains(&arch.as_str()) {
            return Err(Error::parse(s, format!("unknown architecture `{}`", parts[1])));
        }
        // An explicit arm64 variant is kept, in its canonical `v8` spelling
        if parts.len() == 3 && arch == "arm64" && variant.is_none() {
            variant = Some("v8".to_string());
        }

        Ok(Some(Platform { os, arch, variant }))
    }

    /// Environment variables this platform sets for the Go toolchain.
    ///
    /// `GOARM` is only present when a variant exists; an absent variant
    /// never produces an empty-valued variable.
    pub fn env_variables(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![("GOOS", self.os.clone()), ("GOARCH", self.arch.clone())];
        if let Some(ref variant) = self.variant {
            vars.push(("GOARM", variant.clone()));
        }
        vars
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Platform::parse(s)?.ok_or_else(|| Error::parse(s, "platform string is empty"))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}/{}/{}", self.os, self.arch, variant),
            None => write!(f, "{}/{}", self.os, self.arch),
        }
    }
}

fn normalize_os(os: &str) -> String {
    let os = os.to_lowercase();
    match os.as_str() {
        "macos" => "darwin".to_string(),
        _ => os,
    }
}

fn normalize_arch(arch: &str, variant: Option<&str>) -> (String, Option<String>) {
    let arch = arch.to_lowercase();
    let variant = variant.map(|v| v.to_lowercase());

    match arch.as_str() {
        "i386" | "386" => ("386".to_string(), None),
        "x86_64" | "x86-64" | "amd64" => {
            // v1 is the baseline and carries no information
            let variant = variant.filter(|v| v != "v1");
            ("amd64".to_string(), variant)
        }
        "aarch64" | "arm64" => {
            let variant = variant.filter(|v| !matches!(v.as_str(), "8" | "v8" | "v8.0"));
            ("arm64".to_string(), variant)
        }
        "armhf" => ("arm".to_string(), Some("v7".to_string())),
        "armel" => ("arm".to_string(), Some("v6".to_string())),
        "arm" => {
            let variant = match variant.as_deref() {
                Some("5") => Some("v5".to_string()),
                Some("6") => Some("v6".to_string()),
                Some("7") => Some("v7".to_string()),
                Some("8") => Some("v8".to_string()),
                _ => variant,
            };
            ("arm".to_string(), variant)
        }
        _ => (arch, variant),
    }
}
