//! Static lookup tables: file extension → language id, language id → image key.
//!
//! Image keys name the art assets uploaded for the Discord application.

/// Image key used when a language has no dedicated asset, and for the idle
/// payload.
pub const DEFAULT_IMAGE_KEY: &str = "idle-keyboard";

pub const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("java", "java"),
    ("c", "c"),
    ("h", "c"),
    ("cs", "csharp"),
    ("objective-c", "objective-c"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("dart", "dart"),
    ("jl", "julia"),
    ("html", "html"),
    ("css", "css"),
    ("json", "json"),
    ("jsonc", "json"),
    ("md", "markdown"),
    ("lua", "lua"),
    ("kt", "kotlin"),
    ("log", "log"),
    ("gradle", "gradle"),
    ("go", "go"),
    ("env", "properties"),
    ("ipynb", "jupyter"),
    ("jsx", "javascriptreact"),
    ("tsx", "typescriptreact"),
    ("txt", "plaintext"),
    ("xml", "xml"),
    ("swift", "swift"),
    ("vue", "vue"),
    ("sql", "sql"),
    ("gitignore", "git"),
];

pub const LANGUAGE_IMAGES: &[(&str, &str)] = &[
    ("javascript", "js"),
    ("typescript", "ts"),
    ("python", "python"),
    ("java", "java"),
    ("c", "c"),
    ("csharp", "csharp"),
    ("objective-c", "objective-c"),
    ("cpp", "cpp"),
    ("dart", "dart"),
    ("julia", "julia"),
    ("r", "r"),
    ("html", "html"),
    ("css", "css"),
    ("json", "json"),
    ("jsonc", "json"),
    ("markdown", "markdown"),
    ("lua", "lua"),
    ("kotlin", "kotlin"),
    ("log", "log"),
    ("gradle", "gradle"),
    ("go", "go"),
    ("properties", "env"),
    ("jupyter", "jupyter"),
    ("javascriptreact", "jsx"),
    ("typescriptreact", "tsx"),
    ("plaintext", "text"),
    ("xml", "xml"),
    ("swift", "swift"),
    ("vue", "vue"),
    ("sql", "sql"),
    ("git", "git"),
];

/// Expects an already-lowercased extension.
pub fn language_for_extension(extension: &str) -> Option<&'static str> {
    EXTENSION_LANGUAGES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

pub fn image_key_for_language(language: &str) -> Option<&'static str> {
    LANGUAGE_IMAGES
        .iter()
        .find(|(lang, _)| *lang == language)
        .map(|(_, key)| *key)
}
