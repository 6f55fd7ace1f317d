use crate::review::types::AssetExportInfo;
use uuid::Uuid;

/// Pick a collision-free movie file name for a reviewable asset.
///
/// Returns `None` for asset kinds the review pipeline ignores, leaving the
/// host's own path in place.
pub fn resolve_output_path(asset: &AssetExportInfo) -> Option<String> {
    if !asset.kind.is_reviewable() {
        return None;
    }

    let base = if asset.asset_name.trim().is_empty() {
        "review"
    } else {
        asset.asset_name.trim()
    };
    // Asset names come from the host timeline and may contain separators
    let base: String = base
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    Some(format!("{}.{}.mov", base, Uuid::new_v4().simple()))
}
