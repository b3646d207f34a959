//! Grouping of wallet holdings.

use std::collections::BTreeMap;

use crate::pipeline::model::{Asset, ProtoId};

/// Group assets by `(proto, quality)`, keeping each group in input order.
///
/// Keys iterate in ascending proto, then quality order.
///
/// ```rust
/// use chordjob::pipeline::{group_by_proto_quality, Asset};
///
/// let asset = |id: &str, proto, quality: &str| Asset {
///     token_id: id.to_string(),
///     name: format!("card {}", proto),
///     proto,
///     quality: quality.to_string(),
/// };
///
/// let groups = group_by_proto_quality(vec![
///     asset("a", 12, "Meteorite"),
///     asset("b", 3, "Gold"),
///     asset("c", 12, "Meteorite"),
/// ]);
///
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[&(12, "Meteorite".to_string())].len(), 2);
/// ```
pub fn group_by_proto_quality(
    assets: impl IntoIterator<Item = Asset>,
) -> BTreeMap<(ProtoId, String), Vec<Asset>> {
    let mut groups: BTreeMap<(ProtoId, String), Vec<Asset>> = BTreeMap::new();
    for asset in assets {
        groups
            .entry((asset.proto, asset.quality.clone()))
            .or_default()
            .push(asset);
    }
    groups
}
