use std::fmt;
use std::str::FromStr;

/// Polarity of a charge layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChargeType {
    Positive,
    Negative,
}

impl FromStr for ChargeType {
    type Err = ();

    /// Accepts `pos`/`positive`/`+`/`1`/`+1` and `neg`/`negative`/`-`/`-1`, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pos" | "positive" | "+" | "1" | "+1" => Ok(ChargeType::Positive),
            "neg" | "negative" | "-" | "-1" => Ok(ChargeType::Negative),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeType::Positive => write!(f, "positive"),
            ChargeType::Negative => write!(f, "negative"),
        }
    }
}

/// A single charge layer detected by chargepol.
/// Altitudes are in km, coordinates in degrees, time in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChargeEvent {
    pub timestamp: f64,
    pub charge: ChargeType,
    pub z_min: f64,
    pub z_width: f64,
    pub lon: f64,
    pub lat: f64,
}

impl ChargeEvent {
    /// Top of the charge layer
    #[inline(always)]
    pub fn z_max(&self) -> f64 {
        self.z_min + self.z_width
    }
}

/// Inclusive time window `[start, end]` in seconds.
/// A window with `start > end` contains nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[inline(always)]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Membership for a window reached by `shifted`: the start instant belongs
    /// to the preceding window, so stepped windows tile without overlap.
    /// Zero-width windows keep both ends.
    #[inline(always)]
    pub fn contains_stepped(&self, t: f64) -> bool {
        if self.width() > 0.0 {
            self.start < t && t <= self.end
        } else {
            self.contains(t)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn width(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Slide the window by `steps` widths (negative = backwards).
    /// Zero-width windows slide by one second.
    pub fn shifted(&self, steps: i32) -> Self {
        let step = if self.width() > 0.0 { self.width() } else { 1.0 };
        let delta = step * steps as f64;
        Self::new(self.start + delta, self.end + delta)
    }
}

/// Ordered, immutable collection of charge events
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSet {
    events: Vec<ChargeEvent>,
}

impl EventSet {
    pub fn new(events: Vec<ChargeEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChargeEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[ChargeEvent] {
        &self.events
    }

    /// Events with `window.start <= timestamp <= window.end`, order preserved
    pub fn within(&self, window: TimeWindow) -> EventSet {
        self.filtered(|e| window.contains(e.timestamp))
    }

    /// Events of a window reached by stepping, see [`TimeWindow::contains_stepped`]
    pub fn within_stepped(&self, window: TimeWindow) -> EventSet {
        self.filtered(|e| window.contains_stepped(e.timestamp))
    }

    /// Events of a single polarity, order preserved
    pub fn with_charge(&self, charge: ChargeType) -> EventSet {
        self.filtered(|e| e.charge == charge)
    }

    /// Split into disjoint positive and negative sets
    pub fn partition(&self) -> Partitions {
        let (positive, negative): (Vec<_>, Vec<_>) = self
            .events
            .iter()
            .copied()
            .partition(|e| e.charge == ChargeType::Positive);
        Partitions {
            positive: EventSet::new(positive),
            negative: EventSet::new(negative),
        }
    }

    /// Smallest window covering every event
    pub fn time_span(&self) -> Option<TimeWindow> {
        let mut iter = self.events.iter().map(|e| e.timestamp);
        let first = iter.next()?;
        let (start, end) = iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(TimeWindow::new(start, end))
    }

    /// Highest layer top in the set
    pub fn max_altitude(&self) -> Option<f64> {
        self.events.iter().map(ChargeEvent::z_max).reduce(f64::max)
    }

    fn filtered(&self, keep: impl Fn(&ChargeEvent) -> bool) -> EventSet {
        EventSet::new(self.events.iter().filter(|e| keep(e)).copied().collect())
    }
}

impl FromIterator<ChargeEvent> for EventSet {
    fn from_iter<I: IntoIterator<Item = ChargeEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Events split by polarity for rendering
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partitions {
    pub positive: EventSet,
    pub negative: EventSet,
}

impl Partitions {
    pub fn get(&self, charge: ChargeType) -> &EventSet {
        match charge {
            ChargeType::Positive => &self.positive,
            ChargeType::Negative => &self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive.len() + self.negative.len()
    }
}
