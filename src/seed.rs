//! Sample data for local development

use crate::crypto::hash_password;
use crate::error::ApiError;
use crate::store::{ImageRef, ListingStore, NewListing, NewUser, User, UserStore};

const DEMO_USERNAME: &str = "demo";
const DEMO_EMAIL: &str = "demo@stayfinder.local";
const DEMO_PASSWORD: &str = "demo-password";

struct Sample {
    title: &'static str,
    description: &'static str,
    price: f64,
    location: &'static str,
    country: &'static str,
    image_url: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Timbered cabin above the fjord",
        description: "A turf-roofed cabin on the old farm track, with a wood stove \
                      and a view straight down the Aurlandsfjord. Sleeps four.",
        price: 140.0,
        location: "Flåm",
        country: "Norway",
        image_url: "https://picsum.photos/seed/fjord-cabin/800/600",
    },
    Sample {
        title: "Canal-side loft",
        description: "Top floor of a 17th-century warehouse on the Prinsengracht. \
                      Steep stairs, big windows, bikes included.",
        price: 210.0,
        location: "Amsterdam",
        country: "Netherlands",
        image_url: "https://picsum.photos/seed/canal-loft/800/600",
    },
    Sample {
        title: "Stone cottage in the dales",
        description: "Two-up two-down drystone cottage a short walk from the cove. \
                      Open fire, flagstone floors, sheep for neighbours.",
        price: 95.0,
        location: "Malham",
        country: "United Kingdom",
        image_url: "https://picsum.photos/seed/dales-cottage/800/600",
    },
    Sample {
        title: "Surf shack on the point",
        description: "Board storage downstairs, hammock upstairs. The right-hander \
                      breaks in front of the terrace from October to March.",
        price: 60.0,
        location: "Taghazout",
        country: "Morocco",
        image_url: "https://picsum.photos/seed/surf-shack/800/600",
    },
    Sample {
        title: "Alpine chalet with sauna",
        description: "South-facing chalet at 1,800m, ski-in in winter and on the \
                      Haute Route in summer. Sauna and drying room in the cellar.",
        price: 320.0,
        location: "Zermatt",
        country: "Switzerland",
        image_url: "https://picsum.photos/seed/alpine-chalet/800/600",
    },
    Sample {
        title: "Old-town studio under the castle",
        description: "Compact studio in an azulejo-fronted building in Alfama. \
                      Tram 28 stops at the corner, the miradouro is two minutes up.",
        price: 85.0,
        location: "Lisbon",
        country: "Portugal",
        image_url: "https://picsum.photos/seed/alfama-studio/800/600",
    },
];

fn demo_owner<U: UserStore>(user_store: &U) -> Result<User, ApiError> {
    if let Some(user) = user_store.get_user_by_username(DEMO_USERNAME)? {
        return Ok(user);
    }
    let password_hash =
        hash_password(DEMO_PASSWORD).map_err(|e| ApiError::Internal(e.to_string()))?;
    user_store.create_user(NewUser {
        username: DEMO_USERNAME.to_string(),
        email: DEMO_EMAIL.to_string(),
        password_hash,
    })
}

/// Populate an empty store with sample listings owned by a demo user.
/// Does nothing when any listing already exists.
pub fn seed_if_empty<U: UserStore, L: ListingStore>(
    user_store: &U,
    listing_store: &L,
) -> Result<usize, ApiError> {
    if !listing_store.list_listings()?.is_empty() {
        return Ok(0);
    }

    let owner = demo_owner(user_store)?;

    for (idx, sample) in SAMPLES.iter().enumerate() {
        listing_store.create_listing(NewListing {
            title: sample.title.to_string(),
            description: sample.description.to_string(),
            price: sample.price,
            location: sample.location.to_string(),
            country: sample.country.to_string(),
            image: Some(ImageRef {
                url: sample.image_url.to_string(),
                handle: format!("seed-{}", idx),
            }),
            owner: owner.id,
        })?;
    }

    tracing::info!(count = SAMPLES.len(), "Seeded sample listings");
    Ok(SAMPLES.len())
}
