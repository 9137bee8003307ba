//! Species reference data
//!
//! Ten migratory species, each with a twelve-stop yearly route. The table is
//! read-only at runtime; the store only receives an upsert the first time a
//! species is assigned to a bird.

use crate::{Species, Waypoint};
use once_cell::sync::Lazy;

const WINTERING: &str = "wintering";
const NORTHBOUND: &str = "migrating north";
const SOUTHBOUND: &str = "migrating south";
const PRE_BREEDING: &str = "preparing to breed";
const NESTING: &str = "nesting and laying eggs";
const RAISING_CHICKS: &str = "raising chicks";
const ARRIVING_BREEDING: &str = "arriving at breeding grounds";
const PREPARING_NORTH: &str = "preparing to fly north";
const PREPARING_SOUTH: &str = "preparing to fly south";
const CROSSING_HIMALAYAS: &str = "crossing the Himalayas";

fn wp(month: u32, location: &str, lat: f64, lng: f64, activity: &str) -> Waypoint {
    Waypoint {
        month,
        location: location.to_string(),
        lat,
        lng,
        activity: activity.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn species(
    id: &str,
    name: &str,
    scientific_name: &str,
    description: &str,
    habitat: &str,
    personality: [&str; 4],
    glyph: &str,
    migration_route: Vec<Waypoint>,
) -> Species {
    Species {
        id: id.to_string(),
        name: name.to_string(),
        scientific_name: scientific_name.to_string(),
        description: description.to_string(),
        habitat: habitat.to_string(),
        personality: personality.iter().map(|s| s.to_string()).collect(),
        glyph: glyph.to_string(),
        migration_route,
    }
}

static SPECIES: Lazy<Vec<Species>> = Lazy::new(|| {
    vec![
        species(
            "red-billed-gull",
            "Black-headed Gull",
            "Chroicocephalus ridibundus",
            "A graceful waterbird that winters in flocks on warm southern lakes. On Dianchi Lake in Kunming it is the finest sight of the season.",
            "lakes, rivers, coasts",
            ["elegant", "sociable", "lively", "curious"],
            "🕊️",
            vec![
                wp(1, "Dianchi Lake, Kunming", 24.8, 102.7, WINTERING),
                wp(2, "Dianchi Lake, Kunming", 24.8, 102.7, WINTERING),
                wp(3, "Chengdu, Sichuan", 30.5, 104.0, NORTHBOUND),
                wp(4, "Hulun Lake, Inner Mongolia", 48.9, 117.4, NORTHBOUND),
                wp(5, "Lake Baikal, Siberia", 53.5, 108.0, PRE_BREEDING),
                wp(6, "Lake Baikal, Siberia", 53.5, 108.0, NESTING),
                wp(7, "Lake Baikal, Siberia", 53.5, 108.0, RAISING_CHICKS),
                wp(8, "Lake Baikal, Siberia", 53.5, 108.0, RAISING_CHICKS),
                wp(9, "Ulaanbaatar, Mongolia", 47.9, 106.9, SOUTHBOUND),
                wp(10, "Lanzhou, Gansu", 36.0, 103.8, SOUTHBOUND),
                wp(11, "Dianchi Lake, Kunming", 24.8, 102.7, "arriving at wintering grounds"),
                wp(12, "Dianchi Lake, Kunming", 24.8, 102.7, WINTERING),
            ],
        ),
        species(
            "swan-goose",
            "Swan Goose",
            "Anser cygnoides",
            "A loyal migrant that keeps one mate for life. Its V-shaped skeins are the most moving sight of an autumn sky.",
            "wetlands, grassland, farmland",
            ["loyal", "steadfast", "united", "steady"],
            "🦆",
            vec![
                wp(1, "Poyang Lake, Jiangxi", 29.1, 116.3, WINTERING),
                wp(2, "Poyang Lake, Jiangxi", 29.1, 116.3, WINTERING),
                wp(3, "Yellow River Delta, Shandong", 37.8, 119.0, NORTHBOUND),
                wp(4, "Panjin Wetland, Liaoning", 41.1, 122.0, NORTHBOUND),
                wp(5, "Zhalong Wetland, Heilongjiang", 47.2, 124.3, PRE_BREEDING),
                wp(6, "Zhalong Wetland, Heilongjiang", 47.2, 124.3, NESTING),
                wp(7, "Zhalong Wetland, Heilongjiang", 47.2, 124.3, RAISING_CHICKS),
                wp(8, "Zhalong Wetland, Heilongjiang", 47.2, 124.3, RAISING_CHICKS),
                wp(9, "Xianghai Wetland, Jilin", 44.9, 122.3, SOUTHBOUND),
                wp(10, "Baiyangdian Lake, Hebei", 38.9, 116.0, SOUTHBOUND),
                wp(11, "Chaohu Lake, Anhui", 31.6, 117.8, SOUTHBOUND),
                wp(12, "Poyang Lake, Jiangxi", 29.1, 116.3, WINTERING),
            ],
        ),
        species(
            "mute-swan",
            "Mute Swan",
            "Cygnus olor",
            "A noble, graceful waterbird whose white plumage stands for purity. The loveliest spirit on any lake.",
            "lakes, rivers",
            ["noble", "elegant", "romantic", "devoted"],
            "🦢",
            vec![
                wp(1, "Swan Lake, Rongcheng", 37.2, 122.4, WINTERING),
                wp(2, "Swan Lake, Rongcheng", 37.2, 122.4, WINTERING),
                wp(3, "Swan Lake, Rongcheng", 37.2, 122.4, WINTERING),
                wp(4, "Ulansuhai Lake, Inner Mongolia", 41.0, 108.8, NORTHBOUND),
                wp(5, "Bayanbulak Grassland, Xinjiang", 42.9, 84.2, PRE_BREEDING),
                wp(6, "Bayanbulak Grassland, Xinjiang", 42.9, 84.2, NESTING),
                wp(7, "Bayanbulak Grassland, Xinjiang", 42.9, 84.2, RAISING_CHICKS),
                wp(8, "Bayanbulak Grassland, Xinjiang", 42.9, 84.2, RAISING_CHICKS),
                wp(9, "Bayanbulak Grassland, Xinjiang", 42.9, 84.2, PREPARING_SOUTH),
                wp(10, "Zhangye Wetland, Gansu", 38.9, 100.4, SOUTHBOUND),
                wp(11, "Sanmenxia, Shaanxi", 34.8, 111.2, SOUTHBOUND),
                wp(12, "Swan Lake, Rongcheng", 37.2, 122.4, WINTERING),
            ],
        ),
        species(
            "barn-swallow",
            "Barn Swallow",
            "Hirundo rustica",
            "Herald of spring and a nimble flyer. It nests under the eaves and lives in easy company with people.",
            "villages, towns, farmland",
            ["nimble", "diligent", "friendly", "optimistic"],
            "🐦",
            vec![
                wp(1, "Kuala Lumpur, Malaysia", 3.1, 101.7, WINTERING),
                wp(2, "Bangkok, Thailand", 13.7, 100.5, WINTERING),
                wp(3, "Guangzhou, Guangdong", 23.1, 113.3, NORTHBOUND),
                wp(4, "Nanjing, Jiangsu", 32.1, 118.8, ARRIVING_BREEDING),
                wp(5, "Nanjing, Jiangsu", 32.1, 118.8, "building nests"),
                wp(6, "Nanjing, Jiangsu", 32.1, 118.8, NESTING),
                wp(7, "Nanjing, Jiangsu", 32.1, 118.8, RAISING_CHICKS),
                wp(8, "Nanjing, Jiangsu", 32.1, 118.8, RAISING_CHICKS),
                wp(9, "Hangzhou, Zhejiang", 30.3, 120.2, PREPARING_SOUTH),
                wp(10, "Fuzhou, Fujian", 26.1, 119.3, SOUTHBOUND),
                wp(11, "Shenzhen, Guangdong", 22.5, 114.1, SOUTHBOUND),
                wp(12, "Ho Chi Minh City, Vietnam", 10.8, 106.6, WINTERING),
            ],
        ),
        species(
            "common-cuckoo",
            "Common Cuckoo",
            "Cuculus canorus",
            "A mysterious woodland singer whose two-note call means spring has come. A champion of long-distance migration.",
            "forest, scrub",
            ["mysterious", "independent", "clever", "free"],
            "🐦‍⬛",
            vec![
                wp(1, "Kinshasa, Congo", -4.3, 15.3, WINTERING),
                wp(2, "Dodoma, Tanzania", -6.2, 35.7, WINTERING),
                wp(3, "Mumbai, India", 19.1, 72.9, NORTHBOUND),
                wp(4, "Xishuangbanna, Yunnan", 22.0, 100.8, NORTHBOUND),
                wp(5, "Chengdu, Sichuan", 30.5, 104.0, ARRIVING_BREEDING),
                wp(6, "Chengdu, Sichuan", 30.5, 104.0, "breeding"),
                wp(7, "Qinling Mountains, Shaanxi", 33.9, 108.9, "breeding"),
                wp(8, "Qinling Mountains, Shaanxi", 33.9, 108.9, PREPARING_SOUTH),
                wp(9, "Kunming, Yunnan", 25.0, 102.7, SOUTHBOUND),
                wp(10, "Yangon, Myanmar", 16.8, 96.2, SOUTHBOUND),
                wp(11, "Delhi, India", 28.6, 77.2, SOUTHBOUND),
                wp(12, "Nairobi, Kenya", -1.3, 36.8, WINTERING),
            ],
        ),
        species(
            "white-stork",
            "White Stork",
            "Ciconia ciconia",
            "A bird of good omen, said in Europe to bring luck and new life. It builds its nest up high and looks out over the land.",
            "wetlands, grassland, villages",
            ["auspicious", "dignified", "protective", "caring"],
            "🦩",
            vec![
                wp(1, "Johannesburg, South Africa", -26.2, 28.0, WINTERING),
                wp(2, "Dodoma, Tanzania", -6.2, 35.7, PREPARING_NORTH),
                wp(3, "Cairo, Egypt", 30.0, 31.2, NORTHBOUND),
                wp(4, "Istanbul, Turkey", 41.0, 29.0, NORTHBOUND),
                wp(5, "Berlin, Germany", 52.5, 13.4, ARRIVING_BREEDING),
                wp(6, "Berlin, Germany", 52.5, 13.4, NESTING),
                wp(7, "Berlin, Germany", 52.5, 13.4, RAISING_CHICKS),
                wp(8, "Berlin, Germany", 52.5, 13.4, RAISING_CHICKS),
                wp(9, "Athens, Greece", 37.9, 23.7, SOUTHBOUND),
                wp(10, "Tel Aviv, Israel", 32.1, 34.8, SOUTHBOUND),
                wp(11, "Khartoum, Sudan", 15.6, 32.5, SOUTHBOUND),
                wp(12, "Johannesburg, South Africa", -26.2, 28.0, WINTERING),
            ],
        ),
        species(
            "arctic-tern",
            "Arctic Tern",
            "Sterna paradisaea",
            "The longest migration of any bird on Earth. Over a lifetime it flies the distance to the Moon and back three times.",
            "coasts, islands",
            ["resilient", "adventurous", "free", "persistent"],
            "🕊️",
            vec![
                wp(1, "Ross Sea Coast, Antarctica", -77.8, 166.7, WINTERING),
                wp(2, "Ross Sea Coast, Antarctica", -77.8, 166.7, WINTERING),
                wp(3, "South Atlantic Ocean", -40.0, -20.0, NORTHBOUND),
                wp(4, "Dakar, Senegal", 14.7, -17.5, NORTHBOUND),
                wp(5, "Reykjavik, Iceland", 64.1, -21.9, ARRIVING_BREEDING),
                wp(6, "Arctic Circle", 71.0, -8.0, NESTING),
                wp(7, "Arctic Circle", 71.0, -8.0, RAISING_CHICKS),
                wp(8, "Arctic Circle", 71.0, -8.0, RAISING_CHICKS),
                wp(9, "Oslo, Norway", 59.9, 10.7, PREPARING_SOUTH),
                wp(10, "Lisbon, Portugal", 38.7, -9.1, SOUTHBOUND),
                wp(11, "South Atlantic Ocean", -20.0, -10.0, SOUTHBOUND),
                wp(12, "Ross Sea Coast, Antarctica", -77.8, 166.7, WINTERING),
            ],
        ),
        species(
            "bar-headed-goose",
            "Bar-headed Goose",
            "Anser indicus",
            "One of the highest-flying birds in the world, able to cross the Himalayas. A warrior of the plateau.",
            "plateau lakes, wetlands",
            ["brave", "strong", "daring", "team-spirited"],
            "🦆",
            vec![
                wp(1, "Assam, India", 26.1, 91.7, WINTERING),
                wp(2, "Assam, India", 26.1, 91.7, WINTERING),
                wp(3, "Kathmandu, Nepal", 27.7, 85.3, PREPARING_NORTH),
                wp(4, "Lhasa, Tibet", 29.6, 91.1, CROSSING_HIMALAYAS),
                wp(5, "Qinghai Lake", 36.9, 100.2, ARRIVING_BREEDING),
                wp(6, "Qinghai Lake", 36.9, 100.2, NESTING),
                wp(7, "Qinghai Lake", 36.9, 100.2, RAISING_CHICKS),
                wp(8, "Qinghai Lake", 36.9, 100.2, RAISING_CHICKS),
                wp(9, "Qinghai Lake", 36.9, 100.2, PREPARING_SOUTH),
                wp(10, "Shigatse, Tibet", 29.3, 88.9, SOUTHBOUND),
                wp(11, "Pokhara, Nepal", 28.2, 83.9, CROSSING_HIMALAYAS),
                wp(12, "Assam, India", 26.1, 91.7, WINTERING),
            ],
        ),
        species(
            "black-necked-crane",
            "Black-necked Crane",
            "Grus nigricollis",
            "The sacred bird of the plateau and a Tibetan symbol of good fortune. It dances gracefully below the snow peaks.",
            "plateau wetlands, alpine meadows",
            ["sacred", "elegant", "faithful", "pure"],
            "🦩",
            vec![
                wp(1, "Dashanbao Meadow, Yunnan", 27.3, 103.4, WINTERING),
                wp(2, "Dashanbao Meadow, Yunnan", 27.3, 103.4, WINTERING),
                wp(3, "Caohai Lake, Guizhou", 26.8, 104.2, WINTERING),
                wp(4, "Zoige Grassland, Sichuan", 33.6, 102.9, NORTHBOUND),
                wp(5, "Yushu Plateau, Qinghai", 33.0, 97.0, ARRIVING_BREEDING),
                wp(6, "Nagqu, Tibet", 31.5, 92.1, NESTING),
                wp(7, "Nagqu, Tibet", 31.5, 92.1, RAISING_CHICKS),
                wp(8, "Nagqu, Tibet", 31.5, 92.1, RAISING_CHICKS),
                wp(9, "Yushu Plateau, Qinghai", 33.0, 97.0, PREPARING_SOUTH),
                wp(10, "Zoige Grassland, Sichuan", 33.6, 102.9, SOUTHBOUND),
                wp(11, "Caohai Lake, Guizhou", 26.8, 104.2, SOUTHBOUND),
                wp(12, "Dashanbao Meadow, Yunnan", 27.3, 103.4, WINTERING),
            ],
        ),
        species(
            "red-crowned-crane",
            "Red-crowned Crane",
            "Grus japonensis",
            "The immortal crane, emblem of long life and good fortune. Its courtship dance is the finest ballet in nature.",
            "wetlands, marshes",
            ["long-lived", "refined", "ethereal", "constant"],
            "🦩",
            vec![
                wp(1, "Yancheng Coast, Jiangsu", 33.4, 120.1, WINTERING),
                wp(2, "Yancheng Coast, Jiangsu", 33.4, 120.1, WINTERING),
                wp(3, "Yancheng Coast, Jiangsu", 33.4, 120.1, PREPARING_NORTH),
                wp(4, "Panjin, Liaoning", 41.1, 122.0, NORTHBOUND),
                wp(5, "Zhalong, Heilongjiang", 47.2, 124.3, ARRIVING_BREEDING),
                wp(6, "Zhalong, Heilongjiang", 47.2, 124.3, NESTING),
                wp(7, "Zhalong, Heilongjiang", 47.2, 124.3, RAISING_CHICKS),
                wp(8, "Zhalong, Heilongjiang", 47.2, 124.3, RAISING_CHICKS),
                wp(9, "Zhalong, Heilongjiang", 47.2, 124.3, PREPARING_SOUTH),
                wp(10, "Xianghai, Jilin", 44.9, 122.3, SOUTHBOUND),
                wp(11, "Yellow River Mouth, Shandong", 37.8, 119.0, SOUTHBOUND),
                wp(12, "Yancheng Coast, Jiangsu", 33.4, 120.1, WINTERING),
            ],
        ),
    ]
});

/// Every reference species, in catalog order.
pub fn all_species() -> &'static [Species] {
    &SPECIES
}

/// Look up a species by its slug.
pub fn find_species(id: &str) -> Option<&'static Species> {
    SPECIES.iter().find(|s| s.id == id)
}

/// Look up a species by display name, ignoring case.
pub fn species_by_name(name: &str) -> Option<&'static Species> {
    SPECIES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_ten_species() {
        assert_eq!(all_species().len(), 10);
    }

    #[test]
    fn test_species_ids_are_unique() {
        let ids: HashSet<_> = all_species().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), all_species().len());
    }

    #[test]
    fn test_every_route_covers_twelve_months_in_order() {
        for species in all_species() {
            let months: Vec<u32> = species.migration_route.iter().map(|w| w.month).collect();
            assert_eq!(months, (1..=12).collect::<Vec<_>>(), "species {}", species.id);
        }
    }

    #[test]
    fn test_every_species_has_four_traits() {
        for species in all_species() {
            assert_eq!(species.personality.len(), 4, "species {}", species.id);
        }
    }

    #[test]
    fn test_find_species_by_id_and_name() {
        let crane = find_species("red-crowned-crane");
        assert_eq!(crane.map(|s| s.name.as_str()), Some("Red-crowned Crane"));
        assert!(species_by_name("mute swan").is_some());
        assert!(find_species("dodo").is_none());
    }
}
