use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentType {
    GeoLocation,
    ThreatIntel,
    UserContext,
    NetworkAnalysis,
    BehavioralAnalysis,
}

impl EnrichmentType {
    pub const ALL: [EnrichmentType; 5] = [
        EnrichmentType::GeoLocation,
        EnrichmentType::ThreatIntel,
        EnrichmentType::UserContext,
        EnrichmentType::NetworkAnalysis,
        EnrichmentType::BehavioralAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentType::GeoLocation => "geo_location",
            EnrichmentType::ThreatIntel => "threat_intel",
            EnrichmentType::UserContext => "user_context",
            EnrichmentType::NetworkAnalysis => "network_analysis",
            EnrichmentType::BehavioralAnalysis => "behavioral_analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enrichment {
    pub kind: EnrichmentType,
    pub origin_address: Ipv4Addr,
}

/// Synthetic enrichment drawn from a seedable generator.
///
/// The values are placeholders for a real enrichment pipeline and carry no
/// relation to the alert content.
pub struct Enricher {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl Enricher {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn random() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next(&self) -> Enrichment {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let kind = EnrichmentType::ALL[rng.random_range(0..EnrichmentType::ALL.len())];
        let origin_address = Ipv4Addr::from(rng.random::<u32>());

        Enrichment { kind, origin_address }
    }
}
