//! URL tagging and replacement-source synthesis for the immutable path.

use url::Url;

/// Fixed well-known location of the shim-factory module the synthesized
/// source imports.
pub const SHIM_MODULE_SPECIFIER: &str = "modtap:shim";

/// Name of the factory function exported by the shim module.
pub const SHIM_FACTORY_NAME: &str = "instrumentNamespace";

/// Query parameter marking a resolution as claimed for rewriting.
const TAG_PARAM: &str = "modtap";

/// Append the rewrite marker to a resolved URL.
pub fn tag_url(url: &Url) -> Url {
    let mut tagged = url.clone();
    tagged.query_pairs_mut().append_pair(TAG_PARAM, "1");
    tagged
}

/// Remove the rewrite marker, preserving any other query parameters.
/// Returns `None` when the URL is not tagged.
pub fn strip_tag(url: &Url) -> Option<Url> {
    let mut found = false;
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key == TAG_PARAM {
                found = true;
                None
            } else {
                Some((key.into_owned(), value.into_owned()))
            }
        })
        .collect();
    if !found {
        return None;
    }

    let mut untagged = url.clone();
    untagged.set_query(None);
    if !retained.is_empty() {
        let mut pairs = untagged.query_pairs_mut();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
    }
    Some(untagged)
}

pub fn is_tagged(url: &Url) -> bool {
    url.query_pairs().any(|(key, _)| key == TAG_PARAM)
}

/// Filesystem path represented by a URL, textual fallback for non-file
/// schemes.
pub fn file_path_of(url: &Url) -> String {
    url.to_file_path()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| url.path().to_string())
}

/// Synthesize the replacement module source.
///
/// The shape is fixed: import the shim factory, import the real target under
/// a private alias, build the wrapped namespace, and re-export every original
/// binding name read from it.
pub fn synthesize_source(bindings: &[String], target: &Url, specifier: &str) -> String {
    let path = file_path_of(target);
    let mut source = String::new();
    source.push_str(&format!(
        "import {{ {SHIM_FACTORY_NAME} }} from \"{SHIM_MODULE_SPECIFIER}\";\n"
    ));
    source.push_str(&format!("import * as __target from \"{target}\";\n"));
    source.push_str(&format!(
        "const __wrapped = {SHIM_FACTORY_NAME}(__target, \"{specifier}\", \"{path}\");\n"
    ));
    for name in bindings {
        if name == "default" {
            source.push_str("export default __wrapped.default;\n");
        } else {
            source.push_str(&format!("export const {name} = __wrapped.{name};\n"));
        }
    }
    source
}
