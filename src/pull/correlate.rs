// ABOUTME: Correlates full manifest layer digests with short progress-stream layer ids.
// ABOUTME: Tries successively longer digest prefixes until a tracked id matches.

use std::collections::BTreeMap;

use super::layer::Layer;
use super::manifest::{LayerDescriptor, Manifest};
use crate::types::{Digest, LayerId};

/// Find the tracked layer whose short id is a prefix of `digest`.
///
/// The prefix length is not fixed because runtimes shorten ids differently.
pub fn find_tracked<'a>(digest: &Digest, tracked: &'a BTreeMap<LayerId, Layer>) -> Option<&'a Layer> {
    let hex = digest.hex();
    (1..=hex.len()).find_map(|len| tracked.get(&hex[..len]))
}

/// Pair each manifest layer with its tracked layer, in manifest order.
///
/// Manifest layers that have not emitted any progress yet are left out.
pub fn correlate<'a>(
    manifest: &'a Manifest,
    tracked: &'a BTreeMap<LayerId, Layer>,
) -> Vec<(&'a LayerDescriptor, &'a Layer)> {
    manifest
        .layers
        .iter()
        .filter_map(|descriptor| {
            find_tracked(&descriptor.digest, tracked).map(|layer| (descriptor, layer))
        })
        .collect()
}

/// Tracked layers in manifest order.
pub fn ordered_layers<'a>(
    manifest: &'a Manifest,
    tracked: &'a BTreeMap<LayerId, Layer>,
) -> Vec<&'a Layer> {
    correlate(manifest, tracked)
        .into_iter()
        .map(|(_, layer)| layer)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull::event::{LayerEvent, LayerEventKind};

    fn tracked(ids: &[&str]) -> BTreeMap<LayerId, Layer> {
        ids.iter()
            .map(|id| {
                let layer =
                    Layer::new(&LayerEvent::new(*id, LayerEventKind::PullingFsLayer)).unwrap();
                (LayerId::new(*id), layer)
            })
            .collect()
    }

    fn descriptor(digest: &str) -> LayerDescriptor {
        LayerDescriptor::new(Digest::parse(digest).unwrap(), 0)
    }

    #[test]
    fn twelve_char_prefix_lands_at_manifest_position() {
        let manifest = Manifest::new(vec![
            descriptor("sha256:1111111111111111aaaa"),
            descriptor("sha256:abcdef0123456789ffff"),
        ]);
        let layers = tracked(&["abcdef012345", "111111111111"]);

        let ordered = ordered_layers(&manifest, &layers);
        let ids: Vec<&str> = ordered.iter().map(|l| l.id().as_str()).collect();
        assert_eq!(ids, vec!["111111111111", "abcdef012345"]);
    }

    #[test]
    fn untracked_manifest_layers_are_omitted() {
        let manifest = Manifest::new(vec![
            descriptor("sha256:aaaaaaaaaaaaaaaa"),
            descriptor("sha256:bbbbbbbbbbbbbbbb"),
        ]);
        let layers = tracked(&["bbbbbbbbbbbb"]);

        let ordered = ordered_layers(&manifest, &layers);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id().as_str(), "bbbbbbbbbbbb");
    }

    #[test]
    fn shorter_ids_still_match() {
        let manifest = Manifest::new(vec![descriptor("sha256:abcdef0123456789")]);
        let layers = tracked(&["abcdef01"]);
        assert!(find_tracked(&manifest.layers[0].digest, &layers).is_some());
    }
}
