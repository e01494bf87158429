//! `UrlSpectrum` and the encoding-options bitfield

use specio_text::Instant;

/// How a spectrum's source was characterized, using the single-letter codes
/// the URI payload's `I:` field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UriSourceType {
    /// `I` - intrinsic/activation
    Intrinsic,
    /// `C` - calibration
    Calibration,
    /// `B` - background
    Background,
    /// `F` - foreground
    Foreground,
}

impl UriSourceType {
    /// The single uppercase letter used in the `I:` field
    pub fn code(self) -> char {
        match self {
            UriSourceType::Intrinsic => 'I',
            UriSourceType::Calibration => 'C',
            UriSourceType::Background => 'B',
            UriSourceType::Foreground => 'F',
        }
    }

    /// Parse the single-letter `I:` field code
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'I' => Some(UriSourceType::Intrinsic),
            'C' => Some(UriSourceType::Calibration),
            'B' => Some(UriSourceType::Background),
            'F' => Some(UriSourceType::Foreground),
            _ => None,
        }
    }
}

/// A deviation-pair correction point as carried by the `D:` field
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UriDeviationPair {
    /// Energy, keV
    pub energy: f32,
    /// Offset, keV
    pub offset: f32,
}

/// The in-memory shape of one spectrum as the URI codec sees it: plain
/// value types, not [`specio_core::Measurement`], since the URI payload is
/// lossy (channel counts round to non-negative integers, calibration
/// coefficients are single-precision).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UrlSpectrum {
    /// `I:` item type
    pub source_type: UriSourceType,
    /// `T:` live time, seconds
    pub live_time: f32,
    /// `T:` real time, seconds
    pub real_time: f32,
    /// `C:` polynomial calibration coefficients
    pub calibration_coeffs: Vec<f32>,
    /// `D:` deviation pairs, flattened
    pub deviation_pairs: Vec<UriDeviationPair>,
    /// `M:` instrument model
    pub model: Option<String>,
    /// `P:` acquisition start time, seconds resolution (no fractional part)
    pub start_time: Option<Instant>,
    /// `G:` GPS latitude/longitude
    pub gps: Option<(f64, f64)>,
    /// `N:` neutron count sum
    pub neutron_sum: Option<f32>,
    /// `O:` free-text notes or title
    pub title: Option<String>,
    /// `S:` channel counts, rounded to the nearest non-negative integer
    pub channel_data: Vec<u32>,
}

impl UrlSpectrum {
    /// Construct a spectrum with only the required fields set
    pub fn new(source_type: UriSourceType, channel_data: Vec<u32>) -> Self {
        Self {
            source_type,
            live_time: 0.0,
            real_time: 0.0,
            calibration_coeffs: Vec::new(),
            deviation_pairs: Vec::new(),
            model: None,
            start_time: None,
            gps: None,
            neutron_sum: None,
            title: None,
            channel_data,
        }
    }
}

/// Bitfield controlling the URI encoding pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions(pub u8);

impl EncodeOptions {
    /// Skip the DEFLATE stage
    pub const NO_DEFLATE: u8 = 0x01;
    /// Skip Base-45/Base-64 encoding entirely
    pub const NO_BASEX_ENCODING: u8 = 0x02;
    /// Emit channel data as comma-separated decimal integers instead of
    /// StreamVByte
    pub const CSV_CHANNEL_DATA: u8 = 0x04;
    /// Skip counted-zero compression of channel data
    pub const NO_ZERO_COMPRESS_COUNTS: u8 = 0x08;
    /// Use URL-safe Base-64 instead of Base-45
    pub const USE_URL_SAFE_BASE64: u8 = 0x10;
    /// This URI is destined for a `mailto:` body, not a QR code
    pub const AS_MAILTO_URI: u8 = 0x20;

    /// Every bit the decoder is willing to accept
    pub const ALL_KNOWN_BITS: u8 = Self::NO_DEFLATE
        | Self::NO_BASEX_ENCODING
        | Self::CSV_CHANNEL_DATA
        | Self::NO_ZERO_COMPRESS_COUNTS
        | Self::USE_URL_SAFE_BASE64
        | Self::AS_MAILTO_URI;

    /// `true` if `bit` is set
    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// The byte actually persisted in the URI: the mailto bit is never
    /// written, even when [`Self::AS_MAILTO_URI`] was requested, matching
    /// the upstream fix for a historical bug that wrote it by mistake
    pub fn written_byte(self) -> u8 {
        self.0 & !Self::AS_MAILTO_URI
    }
}
