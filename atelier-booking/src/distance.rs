use std::fmt;

use serde::Serialize;

/// Coarse distance classification used to seed the geo-search default
/// filter. Ordered ascending; `Beyond` is the open-ended "200+" band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DistanceBucket {
    Within25,
    Within50,
    Within75,
    Within100,
    Within125,
    Within150,
    Within175,
    Within200,
    Beyond,
}

const THRESHOLDS: [(f64, DistanceBucket); 8] = [
    (25.0, DistanceBucket::Within25),
    (50.0, DistanceBucket::Within50),
    (75.0, DistanceBucket::Within75),
    (100.0, DistanceBucket::Within100),
    (125.0, DistanceBucket::Within125),
    (150.0, DistanceBucket::Within150),
    (175.0, DistanceBucket::Within175),
    (200.0, DistanceBucket::Within200),
];

/// Total classification: the first threshold strictly greater than the
/// distance wins; anything else (no match, absent, NaN) is `Beyond`.
pub fn bucket(distance: Option<f64>) -> DistanceBucket {
    let Some(d) = distance else {
        return DistanceBucket::Beyond;
    };
    for (threshold, b) in THRESHOLDS {
        if d < threshold {
            return b;
        }
    }
    DistanceBucket::Beyond
}

impl DistanceBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceBucket::Within25 => "25",
            DistanceBucket::Within50 => "50",
            DistanceBucket::Within75 => "75",
            DistanceBucket::Within100 => "100",
            DistanceBucket::Within125 => "125",
            DistanceBucket::Within150 => "150",
            DistanceBucket::Within175 => "175",
            DistanceBucket::Within200 => "200",
            DistanceBucket::Beyond => "200+",
        }
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DistanceBucket {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
