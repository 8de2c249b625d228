//! Kernel program sources and build options.

use std::fmt;

/// A `-D` preprocessor define passed to the kernel compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDefine {
    pub name: String,
    pub value: String,
}

impl BuildDefine {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

impl fmt::Display for BuildDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-D{}={}", self.name, self.value)
    }
}

/// Render defines as a compiler option string.
pub fn build_options(defines: &[BuildDefine]) -> String {
    defines.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Parse `-DNAME=value` tokens back out of an option string. Other options
/// are ignored; a define without `=` gets the value `1`, as compilers do.
pub fn parse_defines(options: &str) -> Result<Vec<BuildDefine>, String> {
    let mut defines = Vec::new();
    let mut tokens = options.split_whitespace();
    while let Some(token) = tokens.next() {
        let body = match token.strip_prefix("-D") {
            Some("") => tokens.next().ok_or_else(|| "missing macro name after -D".to_string())?,
            Some(body) => body,
            None => continue,
        };
        let (name, value) = body.split_once('=').unwrap_or((body, "1"));
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid macro name in '-D{body}'"));
        }
        defines.push(BuildDefine::new(name, value));
    }
    Ok(defines)
}

/// Named OpenCL C source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSource {
    pub name: &'static str,
    pub text: &'static str,
}

impl ProgramSource {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    /// Names of the `__kernel` functions the source declares.
    pub fn entry_points(&self) -> Vec<&'static str> {
        entry_points(self.text)
    }
}

/// A `__kernel` declaration: entry point name and parameter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSignature<'a> {
    pub name: &'a str,
    pub arity: usize,
}

/// Scan `source` for `__kernel void NAME(...)` declarations.
pub fn kernel_signatures(source: &str) -> Vec<KernelSignature<'_>> {
    let mut found = Vec::new();
    let mut rest = source;
    while let Some(at) = rest.find("__kernel") {
        rest = &rest[at + "__kernel".len()..];
        let Some(after_void) = rest.trim_start().strip_prefix("void") else { continue };
        let after_void = after_void.trim_start();
        let end = after_void
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after_void.len());
        let name = &after_void[..end];
        let Some(params) = after_void[end..].trim_start().strip_prefix('(') else { continue };
        let Some(close) = params.find(')') else { continue };
        let params = params[..close].trim();
        if name.is_empty() {
            continue;
        }
        let arity = if params.is_empty() || params == "void" { 0 } else { params.split(',').count() };
        found.push(KernelSignature { name, arity });
    }
    found
}

/// Names of the `__kernel` functions declared in `source`.
pub fn entry_points(source: &str) -> Vec<&str> {
    kernel_signatures(source).into_iter().map(|sig| sig.name).collect()
}
