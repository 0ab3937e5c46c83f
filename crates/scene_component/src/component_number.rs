// stable component numbers: well-known names get fixed low ids from the
// static table, everything else hashes into the user range above 2^11.

use std::collections::HashMap;

use crc::{Crc, CRC_32_ISO_HDLC};
use once_cell::sync::Lazy;

use super::SceneComponentId;

/// hashed names land at `crc32 + USER_RANGE_BASE`; ids below this come only
/// from the static table and must match on every peer
pub const USER_RANGE_BASE: u32 = 1 << 11;

const NAME_PAD_SIZE: usize = 128;

// CRC-32/ISO-HDLC is the IEEE reflected polynomial
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

static STATIC_NUMBERS: Lazy<HashMap<&'static str, SceneComponentId>> = Lazy::new(|| {
    HashMap::from_iter([
        ("core::Transform", SceneComponentId::TRANSFORM),
        ("core::Material", SceneComponentId::MATERIAL),
        ("core::MeshRenderer", SceneComponentId::MESH_RENDERER),
        ("core::MeshCollider", SceneComponentId::MESH_COLLIDER),
        ("core::GltfContainer", SceneComponentId::GLTF_CONTAINER),
        ("core::Animator", SceneComponentId::ANIMATOR),
        ("core::EngineInfo", SceneComponentId::ENGINE_INFO),
        ("core::PointerEvents", SceneComponentId::POINTER_EVENTS),
        ("core::PointerEventsResult", SceneComponentId::POINTER_RESULT),
        ("core::Raycast", SceneComponentId::RAYCAST),
        ("core::RaycastResult", SceneComponentId::RAYCAST_RESULT),
        ("core::AvatarAttach", SceneComponentId::AVATAR_ATTACHMENT),
        ("core::AvatarShape", SceneComponentId::AVATAR_SHAPE),
        ("core::Billboard", SceneComponentId::BILLBOARD),
        (
            "core::PlayerIdentityData",
            SceneComponentId::PLAYER_IDENTITY_DATA,
        ),
    ])
});

/// Derive the stable component number for a name. Pure and deterministic:
/// peers compiling the same static table derive identical ids.
pub fn component_number_from_name(name: &str) -> SceneComponentId {
    if let Some(id) = STATIC_NUMBERS.get(name) {
        return *id;
    }

    let mut padded = [0u8; NAME_PAD_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_PAD_SIZE);
    padded[..len].copy_from_slice(&bytes[..len]);

    SceneComponentId(CRC32.checksum(&padded).wrapping_add(USER_RANGE_BASE))
}

/// whether the id belongs to the static (host-known) range
pub fn is_static_number(id: SceneComponentId) -> bool {
    id.0 < USER_RANGE_BASE
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn static_names_return_fixed_numbers() {
        assert_eq!(
            component_number_from_name("core::Transform"),
            SceneComponentId::TRANSFORM
        );
        assert_eq!(
            component_number_from_name("core::MeshRenderer"),
            SceneComponentId::MESH_RENDERER
        );
    }

    #[test]
    fn hashed_names_land_in_the_user_range() {
        let id = component_number_from_name("user::MyWidget");
        assert!(id.0 > USER_RANGE_BASE);
        assert!(!is_static_number(id));
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = component_number_from_name("user::MyWidget");
        let b = component_number_from_name("user::MyWidget");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_matches_crc32_of_padded_name() {
        let mut padded = [0u8; 128];
        padded[..14].copy_from_slice(b"user::MyWidget");
        let expected = Crc::<u32>::new(&CRC_32_ISO_HDLC)
            .checksum(&padded)
            .wrapping_add(2048);
        assert_eq!(component_number_from_name("user::MyWidget").0, expected);
    }

    #[test]
    fn distinct_names_differ() {
        assert_ne!(
            component_number_from_name("user::WidgetA"),
            component_number_from_name("user::WidgetB")
        );
    }
}
