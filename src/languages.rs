//! Language configuration for compilation and execution
//!
//! Profiles come from `files/languages.toml` (embedded at build time) or from
//! a user supplied file with the same layout. Command arguments are templates
//! over a fixed set of placeholders, checked when the registry is loaded.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::JudgeError;

const BUILTIN_LANGUAGES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/files/languages.toml"
));

/// Named value an argument template can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{src}`
    Source,
    /// `{exe}`
    Executable,
    /// `{dir}`
    WorkDir,
    /// `{stem}`
    Stem,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Source,
        Placeholder::Executable,
        Placeholder::WorkDir,
        Placeholder::Stem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Source => "src",
            Placeholder::Executable => "exe",
            Placeholder::WorkDir => "dir",
            Placeholder::Stem => "stem",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Concrete values substituted into templates
#[derive(Debug, Clone)]
pub struct TemplateValues {
    pub source: String,
    pub executable: String,
    pub work_dir: String,
    pub stem: String,
}

impl TemplateValues {
    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Source => &self.source,
            Placeholder::Executable => &self.executable,
            Placeholder::WorkDir => &self.work_dir,
            Placeholder::Stem => &self.stem,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// One command argument, e.g. `-o` or `{dir}/Main.class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    segments: Vec<Segment>,
}

impl ArgTemplate {
    /// Parse `{name}` placeholders; `{{` and `}}` are literal braces.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(format!("unclosed placeholder in {:?}", raw)),
                        }
                    }
                    let placeholder = Placeholder::from_name(&name)
                        .ok_or_else(|| format!("unknown placeholder {{{}}} in {:?}", name, raw))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Value(placeholder));
                }
                '}' => return Err(format!("unmatched '}}' in {:?}", raw)),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, values: &TemplateValues) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(s) => s.as_str(),
                Segment::Value(p) => values.get(*p),
            })
            .collect()
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments.contains(&Segment::Value(placeholder))
    }
}

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Registry key (e.g., "cpp")
    pub key: String,
    /// Build command template (None if not needed)
    pub build: Option<Vec<ArgTemplate>>,
    /// Run command template
    pub run: Vec<ArgTemplate>,
    /// Builds a native executable (gets the platform executable suffix)
    pub native: bool,
}

impl LanguageProfile {
    pub fn build_command(&self, values: &TemplateValues) -> Option<Vec<String>> {
        self.build.as_ref().map(|args| render_all(args, values))
    }

    pub fn run_command(&self, values: &TemplateValues) -> Vec<String> {
        render_all(&self.run, values)
    }
}

fn render_all(args: &[ArgTemplate], values: &TemplateValues) -> Vec<String> {
    args.iter().map(|arg| arg.render(values)).collect()
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLanguageConfig {
    build: Option<Vec<String>>,
    run: Vec<String>,
    #[serde(default)]
    native: bool,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Immutable set of language profiles, keyed by lowercase name
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: BTreeMap<String, LanguageProfile>,
    aliases: HashMap<String, String>,
}

impl LanguageRegistry {
    /// Profiles shipped with the judge
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_LANGUAGES).context("Invalid built-in language configuration")
    }

    /// Load profiles from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read language configuration {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid language configuration {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: BTreeMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut profiles = BTreeMap::new();
        let mut aliases = HashMap::new();

        for (name, raw) in raw_configs {
            let key = name.to_lowercase();
            let invalid = |reason: String| JudgeError::InvalidLanguageConfig {
                language: key.clone(),
                reason,
            };

            let parse_args = |args: &[String], kind: &str| -> Result<Vec<ArgTemplate>, JudgeError> {
                if args.is_empty() {
                    return Err(invalid(format!("empty {} command", kind)));
                }
                args.iter()
                    .map(|arg| ArgTemplate::parse(arg).map_err(&invalid))
                    .collect()
            };

            let build = raw
                .build
                .as_deref()
                .map(|args| parse_args(args, "build"))
                .transpose()?;
            let run = parse_args(&raw.run, "run")?;

            let writes_executable = build
                .iter()
                .flatten()
                .any(|arg| arg.uses(Placeholder::Executable));
            if raw.native && !writes_executable {
                return Err(invalid("native profile must build {exe}".to_string()).into());
            }

            for alias in raw.aliases {
                let alias = alias.to_lowercase();
                if let Some(previous) = aliases.insert(alias.clone(), key.clone()) {
                    return Err(invalid(format!(
                        "alias '{}' already used by '{}'",
                        alias, previous
                    ))
                    .into());
                }
            }

            profiles.insert(
                key.clone(),
                LanguageProfile {
                    key,
                    build,
                    run,
                    native: raw.native,
                },
            );
        }

        if let Some((alias, _)) = aliases.iter().find(|(alias, _)| profiles.contains_key(*alias)) {
            return Err(JudgeError::InvalidLanguageConfig {
                language: alias.clone(),
                reason: "alias shadows a language key".to_string(),
            }
            .into());
        }

        Ok(Self { profiles, aliases })
    }

    /// Get language profile by name or alias (case-insensitive)
    pub fn get(&self, language: &str) -> Option<&LanguageProfile> {
        let key = language.to_lowercase();
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.profiles.get(key)
    }

    /// Like `get`, failing with the list of supported languages
    pub fn resolve(&self, language: &str) -> Result<&LanguageProfile, JudgeError> {
        self.get(language)
            .ok_or_else(|| JudgeError::UnsupportedLanguage {
                key: language.to_string(),
                supported: self.supported_languages(),
            })
    }

    /// Get all supported language names (aliases excluded), sorted
    pub fn supported_languages(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues {
        TemplateValues {
            source: "/src/Main.java".into(),
            executable: "/work/Main".into(),
            work_dir: "/work".into(),
            stem: "Main".into(),
        }
    }

    #[test]
    fn test_builtin_languages() {
        let registry = LanguageRegistry::builtin().unwrap();
        assert_eq!(
            registry.supported_languages(),
            vec!["c", "cpp", "java", "python"]
        );

        let python = registry.get("python").unwrap();
        assert!(python.build.is_none());
        assert_eq!(python.run_command(&values()), vec!["python3", "/src/Main.java"]);

        let cpp = registry.get("cpp").unwrap();
        assert!(cpp.native);
        assert!(cpp.build.is_some());
    }

    #[test]
    fn test_java_runs_from_directory() {
        let registry = LanguageRegistry::builtin().unwrap();
        let java = registry.get("java").unwrap();

        assert!(!java.native);
        assert_eq!(
            java.build_command(&values()).unwrap(),
            vec!["javac", "/src/Main.java", "-d", "/work"]
        );
        assert_eq!(
            java.run_command(&values()),
            vec!["java", "-cp", "/work", "Main"]
        );
    }

    #[test]
    fn test_aliases_and_case() {
        let registry = LanguageRegistry::builtin().unwrap();
        assert_eq!(registry.get("PY").unwrap().key, "python");
        assert_eq!(registry.get("c++").unwrap().key, "cpp");
        assert_eq!(registry.get("Cpp").unwrap().key, "cpp");
    }

    #[test]
    fn test_unsupported_language() {
        let registry = LanguageRegistry::builtin().unwrap();
        let err = registry.resolve("brainfuck").unwrap_err();
        assert!(matches!(err, JudgeError::UnsupportedLanguage { ref key, .. } if key == "brainfuck"));
    }

    #[test]
    fn test_template_parse_and_render() {
        let arg = ArgTemplate::parse("-o{dir}/{stem}.bin").unwrap();
        assert!(arg.uses(Placeholder::WorkDir));
        assert!(!arg.uses(Placeholder::Source));
        assert_eq!(arg.render(&values()), "-o/work/Main.bin");
    }

    #[test]
    fn test_template_escaped_braces() {
        let arg = ArgTemplate::parse("{{literal}}").unwrap();
        assert_eq!(arg.render(&values()), "{literal}");
    }

    #[test]
    fn test_template_errors() {
        assert!(ArgTemplate::parse("{filename_no_ext}").is_err());
        assert!(ArgTemplate::parse("{src").is_err());
        assert!(ArgTemplate::parse("src}").is_err());
    }

    #[test]
    fn test_rejects_unknown_placeholder() {
        let err = LanguageRegistry::from_toml_str(
            r#"
[ruby]
run = ["ruby", "{source}"]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JudgeError>(),
            Some(JudgeError::InvalidLanguageConfig { language, .. }) if language == "ruby"
        ));
    }

    #[test]
    fn test_rejects_empty_run() {
        assert!(LanguageRegistry::from_toml_str("[go]\nrun = []\n").is_err());
    }

    #[test]
    fn test_native_profile_must_build_executable() {
        let err = LanguageRegistry::from_toml_str(
            "[go]\nbuild = [\"go\", \"build\", \"{src}\"]\nrun = [\"{dir}/{stem}\"]\nnative = true\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("{exe}"));

        assert!(LanguageRegistry::from_toml_str("[sh]\nrun = [\"sh\", \"{src}\"]\nnative = true\n").is_err());
    }

    #[test]
    fn test_rejects_duplicate_alias() {
        let content = r#"
[a]
run = ["a"]
aliases = ["x"]

[b]
run = ["b"]
aliases = ["x"]
"#;
        assert!(LanguageRegistry::from_toml_str(content).is_err());
    }

    #[test]
    fn test_custom_registry_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
[rust]
build = ["rustc", "-O", "{src}", "-o", "{exe}"]
run = ["{exe}"]
native = true
aliases = ["rs"]
"#,
        )
        .unwrap();

        let registry = LanguageRegistry::from_file(file.path()).unwrap();
        assert_eq!(registry.supported_languages(), vec!["rust"]);
        assert_eq!(registry.get("rs").unwrap().key, "rust");
        assert!(registry.get("python").is_none());
    }
}
