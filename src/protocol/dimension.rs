//! Registry codecs for the limbo world.
//!
//! The client refuses to join a world whose synchronized registries are
//! missing entries it looks up by key, so every revision gets the smallest
//! codec its client accepts: one overworld dimension type, one biome, and the
//! chat, damage and mob variant entries the client hardcodes.

use crate::core::nbt::{Compound, Tag};
use crate::protocol::packets::config::{RegistryData, RegistryEntry};
use crate::protocol::version::ProtocolVersion;

use crate::protocol::version::ProtocolVersion as V;

pub const OVERWORLD: &str = "minecraft:overworld";

const PLAINS: &str = "minecraft:plains";

/// Lowest block row of the overworld.
pub fn min_y(version: ProtocolVersion) -> i32 {
    if version >= V::V1_17 {
        -64
    } else {
        0
    }
}

/// World height in blocks.
pub fn height(version: ProtocolVersion) -> i32 {
    if version >= V::V1_17 {
        384
    } else {
        256
    }
}

/// Number of 16-block chunk sections in a column.
pub fn section_count(version: ProtocolVersion) -> usize {
    (height(version) / 16) as usize
}

/// Damage types the client resolves by key, with the revision that added each.
const DAMAGE_TYPES: &[(&str, ProtocolVersion)] = &[
    ("arrow", V::V1_19_4),
    ("bad_respawn_point", V::V1_19_4),
    ("cactus", V::V1_19_4),
    ("cramming", V::V1_19_4),
    ("dragon_breath", V::V1_19_4),
    ("drown", V::V1_19_4),
    ("dry_out", V::V1_19_4),
    ("explosion", V::V1_19_4),
    ("fall", V::V1_19_4),
    ("falling_anvil", V::V1_19_4),
    ("falling_block", V::V1_19_4),
    ("falling_stalactite", V::V1_19_4),
    ("fireball", V::V1_19_4),
    ("fireworks", V::V1_19_4),
    ("fly_into_wall", V::V1_19_4),
    ("freeze", V::V1_19_4),
    ("generic", V::V1_19_4),
    ("hot_floor", V::V1_19_4),
    ("in_fire", V::V1_19_4),
    ("in_wall", V::V1_19_4),
    ("indirect_magic", V::V1_19_4),
    ("lava", V::V1_19_4),
    ("lightning_bolt", V::V1_19_4),
    ("magic", V::V1_19_4),
    ("mob_attack", V::V1_19_4),
    ("mob_attack_no_aggro", V::V1_19_4),
    ("mob_projectile", V::V1_19_4),
    ("on_fire", V::V1_19_4),
    ("out_of_world", V::V1_19_4),
    ("player_attack", V::V1_19_4),
    ("player_explosion", V::V1_19_4),
    ("sonic_boom", V::V1_19_4),
    ("stalagmite", V::V1_19_4),
    ("starve", V::V1_19_4),
    ("sting", V::V1_19_4),
    ("sweet_berry_bush", V::V1_19_4),
    ("thorns", V::V1_19_4),
    ("thrown", V::V1_19_4),
    ("trident", V::V1_19_4),
    ("unattributed_fireball", V::V1_19_4),
    ("wither", V::V1_19_4),
    ("wither_skull", V::V1_19_4),
    ("generic_kill", V::V1_20),
    ("outside_border", V::V1_20),
    ("spit", V::V1_20_5),
    ("wind_charge", V::V1_20_5),
    ("mace_smash", V::V1_21),
    ("campfire", V::V1_21_2),
    ("ender_pearl", V::V1_21_2),
];

/// Mob variant registries that became data driven in 1.21.5.
const SIMPLE_VARIANTS: &[(&str, &str, &str)] = &[
    ("minecraft:cat_variant", "minecraft:tabby", "minecraft:entity/cat/cat_tabby"),
    ("minecraft:chicken_variant", "minecraft:temperate", "minecraft:entity/chicken/temperate_chicken"),
    ("minecraft:cow_variant", "minecraft:temperate", "minecraft:entity/cow/temperate_cow"),
    ("minecraft:frog_variant", "minecraft:temperate", "minecraft:entity/frog/temperate_frog"),
    ("minecraft:pig_variant", "minecraft:temperate", "minecraft:entity/pig/temperate_pig"),
];

fn byte(value: bool) -> Tag {
    Tag::Byte(value as i8)
}

fn strings(values: &[&str]) -> Tag {
    Tag::List(values.iter().map(|v| Tag::from(*v)).collect())
}

/// The overworld dimension type, as embedded in the codec and (for
/// 1.16.2 through 1.18.2) sent alone in the join packet.
pub fn overworld_element(version: ProtocolVersion) -> Compound {
    let mut element = Compound::new()
        .with("piglin_safe", byte(false))
        .with("natural", byte(true))
        .with("ambient_light", 0.0f32)
        .with(
            "infiniburn",
            if version >= V::V1_18_2 {
                "#minecraft:infiniburn_overworld"
            } else {
                "minecraft:infiniburn_overworld"
            },
        )
        .with("respawn_anchor_works", byte(false))
        .with("has_skylight", byte(true))
        .with("bed_works", byte(true))
        .with("has_raids", byte(true))
        .with("logical_height", height(version))
        .with("ultrawarm", byte(false))
        .with("has_ceiling", byte(false));

    if version < V::V1_16_2 {
        element.insert("shrunk", byte(false));
    } else {
        element.insert("effects", OVERWORLD);
        element.insert("coordinate_scale", 1.0f64);
    }
    if version >= V::V1_17 {
        element.insert("min_y", min_y(version));
        element.insert("height", height(version));
    }
    if version >= V::V1_19 {
        element.insert("monster_spawn_light_level", 0);
        element.insert("monster_spawn_block_light_limit", 0);
    }
    element
}

fn plains(version: ProtocolVersion) -> Compound {
    let effects = Compound::new()
        .with("sky_color", 7_907_327)
        .with("water_fog_color", 329_011)
        .with("fog_color", 12_638_463)
        .with("water_color", 4_159_204);

    let mut biome = Compound::new();
    if version >= V::V1_19_4 {
        biome.insert("has_precipitation", byte(false));
    } else {
        biome.insert("precipitation", "none");
    }
    if version < V::V1_18 {
        biome.insert("depth", 0.125f32);
        biome.insert("scale", 0.05f32);
    }
    biome.insert("temperature", 0.8f32);
    biome.insert("downfall", 0.4f32);
    if version < V::V1_19 {
        biome.insert("category", "plains");
    }
    biome.insert("effects", effects);
    biome
}

fn chat_decoration(translation_key: &str, parameters: &[&str]) -> Compound {
    Compound::new()
        .with("translation_key", translation_key)
        .with("parameters", strings(parameters))
}

fn chat_type(version: ProtocolVersion) -> Compound {
    let parameters = ["sender", "content"];
    if version >= V::V1_19_1 {
        Compound::new()
            .with("chat", chat_decoration("chat.type.text", &parameters))
            .with("narration", chat_decoration("chat.type.text.narrate", &parameters))
    } else {
        let chat = chat_decoration("chat.type.text", &parameters).with("style", Compound::new());
        let narration = chat_decoration("chat.type.text.narrate", &parameters).with("style", Compound::new());
        Compound::new()
            .with("chat", Compound::new().with("decoration", chat))
            .with(
                "narration",
                Compound::new()
                    .with("decoration", narration)
                    .with("priority", "chat"),
            )
    }
}

fn damage_types(version: ProtocolVersion) -> Vec<(String, Compound)> {
    DAMAGE_TYPES
        .iter()
        .filter(|(_, since)| version >= *since)
        .map(|(name, _)| {
            let element = Compound::new()
                .with("message_id", *name)
                .with("scaling", "when_caused_by_living_non_player")
                .with("exhaustion", 0.1f32);
            (format!("minecraft:{name}"), element)
        })
        .collect()
}

fn wolf_variant(version: ProtocolVersion) -> Compound {
    let wild = "minecraft:entity/wolf/wolf";
    let tame = "minecraft:entity/wolf/wolf_tame";
    let angry = "minecraft:entity/wolf/wolf_angry";
    if version >= V::V1_21_5 {
        let assets = Compound::new()
            .with("wild", wild)
            .with("tame", tame)
            .with("angry", angry);
        Compound::new()
            .with("assets", assets)
            .with("spawn_conditions", Tag::List(Vec::new()))
    } else {
        Compound::new()
            .with("wild_texture", wild)
            .with("tame_texture", tame)
            .with("angry_texture", angry)
            .with("biomes", PLAINS)
    }
}

fn wolf_sound_variant() -> Compound {
    Compound::new()
        .with("ambient_sound", "minecraft:entity.wolf.ambient")
        .with("death_sound", "minecraft:entity.wolf.death")
        .with("growl_sound", "minecraft:entity.wolf.growl")
        .with("hurt_sound", "minecraft:entity.wolf.hurt")
        .with("pant_sound", "minecraft:entity.wolf.pant")
        .with("whine_sound", "minecraft:entity.wolf.whine")
}

fn painting_variant() -> Compound {
    Compound::new()
        .with("asset_id", "minecraft:kebab")
        .with("width", 1)
        .with("height", 1)
}

/// Every synchronized registry for `version`, as `(registry, [(key, element)])`.
fn registries(version: ProtocolVersion) -> Vec<(&'static str, Vec<(String, Compound)>)> {
    let mut registries = vec![
        (
            "minecraft:dimension_type",
            vec![(OVERWORLD.to_owned(), overworld_element(version))],
        ),
        ("minecraft:worldgen/biome", vec![(PLAINS.to_owned(), plains(version))]),
    ];
    if version >= V::V1_19 {
        registries.push(("minecraft:chat_type", vec![("minecraft:chat".to_owned(), chat_type(version))]));
    }
    if version >= V::V1_19_4 {
        registries.push(("minecraft:damage_type", damage_types(version)));
    }
    if version >= V::V1_20_5 {
        registries.push(("minecraft:wolf_variant", vec![("minecraft:pale".to_owned(), wolf_variant(version))]));
    }
    if version >= V::V1_21 {
        registries.push((
            "minecraft:painting_variant",
            vec![("minecraft:kebab".to_owned(), painting_variant())],
        ));
    }
    if version >= V::V1_21_5 {
        for (registry, key, asset) in SIMPLE_VARIANTS {
            let element = Compound::new().with("asset_id", *asset);
            registries.push((*registry, vec![((*key).to_owned(), element)]));
        }
        registries.push((
            "minecraft:wolf_sound_variant",
            vec![("minecraft:classic".to_owned(), wolf_sound_variant())],
        ));
    }
    registries
}

/// The single-compound codec carried by the join packet (1.16 to 1.20.1)
/// or by one registry data packet (1.20.2 and 1.20.3).
pub fn join_codec(version: ProtocolVersion) -> Compound {
    if version < V::V1_16_2 {
        let dimension = overworld_element(version).with("name", OVERWORLD);
        return Compound::new().with("dimension", Tag::List(vec![Tag::Compound(dimension)]));
    }

    let mut codec = Compound::new();
    for (registry, entries) in registries(version) {
        let value = entries
            .into_iter()
            .enumerate()
            .map(|(id, (name, element))| {
                Tag::Compound(
                    Compound::new()
                        .with("name", name)
                        .with("id", id as i32)
                        .with("element", element),
                )
            })
            .collect();
        codec.insert(
            registry,
            Compound::new()
                .with("type", registry)
                .with("value", Tag::List(value)),
        );
    }
    codec
}

/// Registry data packets to send during configuration.
pub fn registry_packets(version: ProtocolVersion) -> Vec<RegistryData> {
    if version < V::V1_20_2 {
        return Vec::new();
    }
    if version < V::V1_20_5 {
        return vec![RegistryData::Codec(join_codec(version))];
    }
    registries(version)
        .into_iter()
        .map(|(id, entries)| RegistryData::Registry {
            id: id.to_owned(),
            entries: entries
                .into_iter()
                .map(|(name, data)| RegistryEntry { name, data: Some(data) })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_dimensions() {
        assert_eq!(section_count(V::V1_16_4), 16);
        assert_eq!(section_count(V::V1_18), 24);
        assert_eq!(min_y(V::V1_17) + height(V::V1_17), 320);
        let element = overworld_element(V::V1_18);
        assert!(matches!(element.get("min_y"), Some(Tag::Int(-64))));
    }

    #[test]
    fn test_old_codec_is_dimension_list() {
        let codec = join_codec(V::V1_16);
        assert_eq!(codec.len(), 1);
        assert!(matches!(codec.get("dimension"), Some(Tag::List(items)) if items.len() == 1));
    }

    #[test]
    fn test_registries_grow_with_version() {
        assert_eq!(join_codec(V::V1_16_2).len(), 2);
        assert_eq!(join_codec(V::V1_19).len(), 3);
        assert_eq!(join_codec(V::V1_19_4).len(), 4);
        assert!(join_codec(V::V1_19_4).get("minecraft:damage_type").is_some());
    }

    #[test]
    fn test_damage_types_are_gated() {
        let old: Vec<_> = damage_types(V::V1_19_4).into_iter().map(|(n, _)| n).collect();
        assert!(!old.contains(&"minecraft:generic_kill".to_owned()));
        let new: Vec<_> = damage_types(V::V1_21_2).into_iter().map(|(n, _)| n).collect();
        assert!(new.contains(&"minecraft:ender_pearl".to_owned()));
        assert_eq!(new.len(), DAMAGE_TYPES.len());
    }

    #[test]
    fn test_registry_packets_per_era() {
        assert!(registry_packets(V::V1_20).is_empty());
        assert!(matches!(registry_packets(V::V1_20_2).as_slice(), [RegistryData::Codec(_)]));

        let modern = registry_packets(V::V1_21_5);
        let ids: Vec<_> = modern
            .iter()
            .filter_map(|packet| match packet {
                RegistryData::Registry { id, .. } => Some(id.as_str()),
                RegistryData::Codec(_) => None,
            })
            .collect();
        assert!(ids.contains(&"minecraft:wolf_sound_variant"));
        assert!(ids.contains(&"minecraft:pig_variant"));
        assert_eq!(ids.len(), modern.len());
    }

    #[test]
    fn test_element_fields_follow_version() {
        let legacy = overworld_element(V::V1_16_1);
        assert!(legacy.get("shrunk").is_some());
        assert!(legacy.get("min_y").is_none());

        let modern = overworld_element(V::V1_20);
        assert!(modern.get("min_y").is_some());
        assert!(modern.get("monster_spawn_light_level").is_some());
    }
}
