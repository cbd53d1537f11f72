//! Detection tables for the extractor, kept as plain data rather than match
//! arms scattered through control flow so they can be extended — or swapped
//! for a synthetic table in tests — without touching detection logic.

pub struct LanguageSpec {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub patterns: &'static [&'static str],
    pub extensions: &'static [&'static str],
}

pub struct FrameworkSpec {
    pub name: &'static str,
    pub language: &'static str,
    pub indicators: &'static [&'static str],
}

pub struct ErrorSignature {
    pub name: &'static str,
    pub pattern: &'static str,
    pub importance: f64,
}

pub struct TopicSpec {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        name: "python",
        keywords: &["def ", "import ", "elif ", "self.", "print(", "lambda "],
        patterns: &[r"def\s+\w+\s*\(", r"import\s+\w+", r"from\s+\w+\s+import"],
        extensions: &[".py", ".pyi"],
    },
    LanguageSpec {
        name: "rust",
        keywords: &["fn ", "let mut", "impl ", "pub struct", "match ", "::<"],
        patterns: &[r"fn\s+\w+\s*\(", r"impl\s+\w+", r"let\s+mut\s+\w+"],
        extensions: &[".rs"],
    },
    LanguageSpec {
        name: "javascript",
        keywords: &["const ", "=>", "require(", "console.log", "function "],
        patterns: &[r"const\s+\w+\s*=", r"function\s*\w*\s*\(", r"=>\s*\{"],
        extensions: &[".js", ".mjs", ".cjs"],
    },
    LanguageSpec {
        name: "typescript",
        keywords: &["interface ", "type ", ": string", ": number", "export default"],
        patterns: &[r"interface\s+\w+", r":\s*(string|number|boolean)\b"],
        extensions: &[".ts", ".tsx"],
    },
    LanguageSpec {
        name: "go",
        keywords: &["func ", "package ", "go func", "chan ", ":= "],
        patterns: &[r"func\s+\w+\s*\(", r"package\s+\w+"],
        extensions: &[".go"],
    },
    LanguageSpec {
        name: "java",
        keywords: &["public class", "private ", "System.out.println", "@Override"],
        patterns: &[r"public\s+class\s+\w+", r"private\s+\w+\s+\w+\("],
        extensions: &[".java"],
    },
    LanguageSpec {
        name: "c",
        keywords: &["#include", "int main(", "malloc(", "printf("],
        patterns: &[r"#include\s*<\w+\.h>", r"int\s+main\s*\("],
        extensions: &[".c", ".h"],
    },
    LanguageSpec {
        name: "cpp",
        keywords: &["std::", "#include <iostream>", "cout <<", "namespace "],
        patterns: &[r"std::\w+", r"namespace\s+\w+"],
        extensions: &[".cpp", ".hpp", ".cc"],
    },
    LanguageSpec {
        name: "sql",
        keywords: &["SELECT ", "INSERT INTO", "CREATE TABLE", "WHERE "],
        patterns: &[r"(?i)select\s+.+\s+from", r"(?i)create\s+table"],
        extensions: &[".sql"],
    },
    LanguageSpec {
        name: "bash",
        keywords: &["#!/bin/bash", "echo ", "$(", "fi\n"],
        patterns: &[r"#!/bin/(ba)?sh", r"\$\{\w+\}"],
        extensions: &[".sh", ".bash"],
    },
];

pub const FRAMEWORKS: &[FrameworkSpec] = &[
    FrameworkSpec { name: "django", language: "python", indicators: &["django", "models.Model", "urls.py", "settings.py"] },
    FrameworkSpec { name: "flask", language: "python", indicators: &["flask", "@app.route", "Flask(__name__)"] },
    FrameworkSpec { name: "fastapi", language: "python", indicators: &["fastapi", "@app.get", "@app.post", "FastAPI()"] },
    FrameworkSpec { name: "axum", language: "rust", indicators: &["axum", "Router::new", "axum::"] },
    FrameworkSpec { name: "actix", language: "rust", indicators: &["actix", "HttpServer", "actix_web"] },
    FrameworkSpec { name: "tokio", language: "rust", indicators: &["tokio::", "#[tokio::main]"] },
    FrameworkSpec { name: "react", language: "javascript", indicators: &["react", "useState", "useEffect", "jsx"] },
    FrameworkSpec { name: "vue", language: "javascript", indicators: &["vue", "v-if", "v-for", "createApp"] },
    FrameworkSpec { name: "express", language: "javascript", indicators: &["express", "app.listen", "express()"] },
    FrameworkSpec { name: "nextjs", language: "typescript", indicators: &["next/", "getServerSideProps", "next.config"] },
    FrameworkSpec { name: "gin", language: "go", indicators: &["gin.Default", "gin.Engine", "gin-gonic"] },
    FrameworkSpec { name: "spring", language: "java", indicators: &["@SpringBootApplication", "springframework", "@Autowired"] },
];

pub const ERROR_SIGNATURES: &[ErrorSignature] = &[
    ErrorSignature { name: "python_traceback", pattern: r"Traceback \(most recent call last\)", importance: 0.8 },
    ErrorSignature { name: "null_reference", pattern: r"(?i)null(pointer)?(reference)? exception", importance: 0.7 },
    ErrorSignature { name: "type_error", pattern: r"(?i)type\s?error:?", importance: 0.6 },
    ErrorSignature { name: "syntax_error", pattern: r"(?i)syntax\s?error", importance: 0.6 },
    ErrorSignature { name: "panic", pattern: r"(?i)thread '.*' panicked at", importance: 0.8 },
    ErrorSignature { name: "segfault", pattern: r"(?i)segmentation fault", importance: 0.9 },
    ErrorSignature { name: "connection_refused", pattern: r"(?i)connection refused", importance: 0.5 },
    ErrorSignature { name: "module_not_found", pattern: r"(?i)(module|cannot find module|no module named)", importance: 0.5 },
];

pub const TOPICS: &[TopicSpec] = &[
    TopicSpec { name: "authentication", keywords: &["auth", "login", "token", "session", "oauth", "jwt"] },
    TopicSpec { name: "database", keywords: &["database", "sql", "query", "migration", "schema", "index"] },
    TopicSpec { name: "testing", keywords: &["test", "assert", "mock", "fixture", "coverage"] },
    TopicSpec { name: "deployment", keywords: &["deploy", "docker", "kubernetes", "ci/cd", "pipeline"] },
    TopicSpec { name: "performance", keywords: &["performance", "latency", "optimize", "benchmark", "profiling"] },
    TopicSpec { name: "security", keywords: &["security", "vulnerability", "encryption", "xss", "injection"] },
    TopicSpec { name: "api_design", keywords: &["api", "endpoint", "rest", "graphql", "webhook"] },
    TopicSpec { name: "ui_design", keywords: &["ui", "component", "css", "layout", "responsive"] },
];

pub const FILE_EXTENSIONS: &[&str] = &[
    ".py", ".rs", ".js", ".jsx", ".ts", ".tsx", ".go", ".java", ".c", ".h", ".cpp", ".hpp",
    ".rb", ".php", ".sql", ".sh", ".yml", ".yaml", ".json", ".toml", ".md",
];

pub const CLASS_STOP_LIST: &[&str] = &[
    "JavaScript", "TypeScript", "PostgreSQL", "MySQL", "GraphQL", "OAuth", "JSON", "HTML", "CSS",
];

pub const GOAL_PATTERNS: &[&str] = &[
    r"(?i)i want to (.{5,100})",
    r"(?i)i need to (.{5,100})",
    r"(?i)(?:build|fix|implement) (.{5,100})",
    r"(?i)working on (.{5,100})",
];

pub fn language_by_name(name: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|l| l.name.eq_ignore_ascii_case(name))
}

pub fn language_by_extension(ext: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|l| l.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
