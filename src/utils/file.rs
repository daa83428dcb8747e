use std::path::Path;
use uuid::Uuid;

/// Generate an opaque object key for a new upload: a random id plus the
/// original extension, namespaced under the owner.
pub fn object_key(owner_id: Uuid, original_name: &str, content_type: &str) -> String {
    let ext = file_extension(original_name, content_type);
    format!("{}/{}.{}", owner_id, Uuid::new_v4(), ext)
}

/// Extension for a stored object, preferring the client-supplied filename
/// and falling back to the declared content type.
pub fn file_extension(original_name: &str, content_type: &str) -> String {
    if let Some(ext) = Path::new(original_name).extension().and_then(|e| e.to_str()) {
        return ext.to_ascii_lowercase();
    }

    mime_guess::get_mime_extensions_str(content_type)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| "bin".to_string())
}

/// Best-effort content type for a key, used by backends that do not persist
/// one alongside the bytes.
pub fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key).first_or_octet_stream().to_string()
}
