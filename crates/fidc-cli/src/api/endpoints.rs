//! API endpoint URL builders
//!
//! Helper functions to construct import service URLs. Import ids are opaque,
//! so they are always percent-encoded into the path.

/// Collection URL for imports (list and create)
pub fn imports_url(base_url: &str) -> String {
    format!("{}/api/importacoes", base_url)
}

/// Paged list URL
pub fn import_list_url(base_url: &str, page: u32, page_size: u32) -> String {
    format!("{}?page={}&pageSize={}", imports_url(base_url), page, page_size)
}

/// Single import URL
pub fn import_url(base_url: &str, id: &str) -> String {
    format!("{}/{}", imports_url(base_url), urlencoding::encode(id))
}

/// Reprocess command URL for one import
pub fn reprocess_url(base_url: &str, id: &str) -> String {
    format!("{}/reprocessar", import_url(base_url, id))
}
