// build.rs

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const FALLBACK_LANG: &str = "en";

fn main() {
    let lang = select_language();
    println!("cargo:rustc-env=WP_LANG_EFFECTIVE={}", lang);

    println!("cargo:rerun-if-env-changed=WP_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let catalog = load_catalog(&lang);
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is always set for build scripts");
    let dest_path = Path::new(&out_dir).join("translations.rs");
    fs::write(&dest_path, render_macro(&catalog)).expect("Failed to write translations.rs");
}

/// `lang_*` features win over `WP_LANG`; English is the last resort.
fn select_language() -> String {
    let mut active: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    active.sort();

    match active.split_first() {
        Some((first, rest)) => {
            if !rest.is_empty() {
                println!(
                    "cargo:warning=Multiple language features enabled ({:?}). Using '{}'.",
                    active, first
                );
            }
            first.clone()
        }
        None => env::var("WP_LANG").unwrap_or_else(|_| FALLBACK_LANG.to_string()),
    }
}

/// Loads the English catalog and overlays the selected language on top of it,
/// so a partial translation never leaves a key undefined.
fn load_catalog(lang: &str) -> BTreeMap<String, String> {
    let fallback_path = format!("locales/{}.toml", FALLBACK_LANG);
    let fallback = fs::read_to_string(&fallback_path)
        .unwrap_or_else(|_| panic!("Failed to read fallback catalog: {}", fallback_path));
    let mut catalog: BTreeMap<String, String> = toml::from_str(&fallback)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", fallback_path, e));

    if lang != FALLBACK_LANG {
        let lang_path = format!("locales/{}.toml", lang);
        match fs::read_to_string(&lang_path) {
            Ok(content) => {
                let overlay: BTreeMap<String, String> = toml::from_str(&content)
                    .unwrap_or_else(|e| panic!("Failed to parse {}: {}", lang_path, e));
                catalog.extend(overlay);
            }
            Err(_) => println!(
                "cargo:warning=Catalog '{}' not found. Falling back to '{}'.",
                lang_path, FALLBACK_LANG
            ),
        }
    }
    catalog
}

/// Generates the `t!` macro: one arm per key, plus a compile error for unknown keys.
fn render_macro(catalog: &BTreeMap<String, String>) -> String {
    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in catalog {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, escaped));
    }
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push('}');
    code
}
