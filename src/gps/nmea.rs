// src/gps/nmea.rs
//! NMEA sentence validation and position decoding

use super::data::Position;
use crate::error::Rejection;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

/// XOR of every byte between `$` and `*`.
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, b| acc ^ b)
}

/// Sentence types this parser decodes into positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    Gga,
    Rmc,
}

/// Turns checksum-validated lines into positions.
///
/// The parser is stateful only in one respect: GGA carries a time of day but no
/// date, so the date of the most recent RMC sentence is remembered and used to
/// build GGA timestamps.
#[derive(Debug, Default)]
pub struct SentenceParser {
    date: Option<NaiveDate>,
}

impl SentenceParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the date used for GGA timestamps until an RMC supplies one.
    pub fn with_date(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }

    /// The date GGA timestamps are currently anchored to, if any has been seen
    pub fn current_date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Validate and decode one complete sentence.
    pub fn parse(&mut self, line: &str) -> Result<Position, Rejection> {
        let payload = verify_frame(line)?;
        let parts: Vec<&str> = payload.split(',').collect();

        match sentence_kind(parts[0])? {
            SentenceKind::Gga => self.parse_gga(&parts),
            SentenceKind::Rmc => self.parse_rmc(&parts),
        }
    }

    /// Parse GGA (Global Positioning System Fix Data)
    fn parse_gga(&self, parts: &[&str]) -> Result<Position, Rejection> {
        if parts.len() < 10 {
            return Err(Rejection::MissingField("GGA fields"));
        }

        // Fix quality (field 6): 0 means no fix
        match required(parts[6], "fix quality")?.parse::<u8>() {
            Ok(0) => return Err(Rejection::NoFix),
            Ok(_) => {}
            Err(_) => return Err(Rejection::MalformedField("fix quality")),
        }

        let time = parse_time(parts[1])?;
        let latitude = parse_coordinate(parts[2], parts[3], 'N', 'S', "latitude")?;
        let longitude = parse_coordinate(parts[4], parts[5], 'E', 'W', "longitude")?;

        // Altitude (field 9) is optional
        let altitude = match parts[9] {
            "" => None,
            alt => match alt.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => return Err(Rejection::MalformedField("altitude")),
            },
        };

        build_position(latitude, longitude, altitude, self.anchor_date(), time)
    }

    /// Parse RMC (Recommended Minimum Specific GNSS Data)
    fn parse_rmc(&mut self, parts: &[&str]) -> Result<Position, Rejection> {
        if parts.len() < 10 {
            return Err(Rejection::MissingField("RMC fields"));
        }

        // The receiver clock keeps the date even without a fix
        let date = match parts[9] {
            "" => None,
            raw => Some(parse_date(raw)?),
        };
        if date.is_some() {
            self.date = date;
        }

        match required(parts[2], "status")? {
            "A" => {}
            "V" => return Err(Rejection::NoFix),
            _ => return Err(Rejection::MalformedField("status")),
        }

        let time = parse_time(parts[1])?;
        let latitude = parse_coordinate(parts[3], parts[4], 'N', 'S', "latitude")?;
        let longitude = parse_coordinate(parts[5], parts[6], 'E', 'W', "longitude")?;
        // No date in this sentence: fall back to the GGA anchor
        let date = date.unwrap_or_else(|| self.anchor_date());

        build_position(latitude, longitude, None, date, time)
    }

    /// Last RMC date seen, else today in UTC
    fn anchor_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Structural and checksum checks. Returns the payload between `$` and `*`.
fn verify_frame(line: &str) -> Result<&str, Rejection> {
    let body = line
        .strip_prefix('$')
        .ok_or(Rejection::Malformed("missing '$' start"))?;
    let (payload, trailer) = body
        .rsplit_once('*')
        .ok_or(Rejection::Malformed("missing '*' checksum delimiter"))?;

    let trailer = trailer.trim_end();
    if trailer.len() != 2 {
        return Err(Rejection::Malformed("checksum is not two hex digits"));
    }
    let expected = u8::from_str_radix(trailer, 16)
        .map_err(|_| Rejection::Malformed("checksum is not two hex digits"))?;

    let computed = checksum(payload);
    if computed != expected {
        return Err(Rejection::ChecksumMismatch { expected, computed });
    }
    Ok(payload)
}

/// Split the address field into talker and sentence type and filter on type.
fn sentence_kind(address: &str) -> Result<SentenceKind, Rejection> {
    if address.len() != 5 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Rejection::Malformed("bad address field"));
    }

    match &address[2..] {
        "GGA" => Ok(SentenceKind::Gga),
        "RMC" => Ok(SentenceKind::Rmc),
        other => Err(Rejection::Unsupported(other.to_string())),
    }
}

fn required<'a>(field: &'a str, name: &'static str) -> Result<&'a str, Rejection> {
    if field.is_empty() {
        Err(Rejection::MissingField(name))
    } else {
        Ok(field)
    }
}

/// Convert `(d)ddmm.mmmm` plus hemisphere into signed decimal degrees.
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    positive: char,
    negative: char,
    name: &'static str,
) -> Result<f64, Rejection> {
    let raw = required(value, name)?
        .parse::<f64>()
        .map_err(|_| Rejection::MalformedField(name))?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(Rejection::MalformedField(name));
    }

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(Rejection::MalformedField(name));
    }
    let decimal = degrees + minutes / 60.0;

    let mut hemi = required(hemisphere, name)?.chars();
    match (hemi.next(), hemi.next()) {
        (Some(c), None) if c == positive => Ok(decimal),
        (Some(c), None) if c == negative => Ok(-decimal),
        _ => Err(Rejection::MalformedField(name)),
    }
}

/// `hhmmss` with optional fractional seconds, which are dropped.
fn parse_time(field: &str) -> Result<NaiveTime, Rejection> {
    let field = required(field, "time")?;
    let whole = field.split('.').next().unwrap_or(field);
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Rejection::MalformedField("time"));
    }

    let num = |range: std::ops::Range<usize>| whole[range].parse::<u32>().unwrap_or(u32::MAX);
    NaiveTime::from_hms_opt(num(0..2), num(2..4), num(4..6))
        .ok_or(Rejection::MalformedField("time"))
}

/// `ddmmyy`; two-digit years 69-99 are 19xx, 00-68 are 20xx.
fn parse_date(field: &str) -> Result<NaiveDate, Rejection> {
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Rejection::MalformedField("date"));
    }

    let num = |range: std::ops::Range<usize>| field[range].parse::<u32>().unwrap_or(u32::MAX);
    let (day, month, yy) = (num(0..2), num(2..4), num(4..6) as i32);
    let year = if yy >= 69 { 1900 + yy } else { 2000 + yy };
    NaiveDate::from_ymd_opt(year, month, day).ok_or(Rejection::MalformedField("date"))
}

fn build_position(
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<Position, Rejection> {
    let timestamp = Utc.from_utc_datetime(&date.and_time(time)).timestamp();
    Position::new(latitude, longitude, altitude, timestamp).ok_or(Rejection::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wrap a payload in `$...*hh`.
    fn sentence(payload: &str) -> String {
        format!("${}*{:02X}", payload, checksum(payload))
    }

    fn march_23_1994() -> NaiveDate {
        NaiveDate::from_ymd_opt(1994, 3, 23).unwrap()
    }

    #[test]
    fn test_gpgga_parsing() {
        let mut parser = SentenceParser::with_date(march_23_1994());
        let gpgga = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

        let pos = parser.parse(gpgga).unwrap();

        assert!((pos.latitude() - 48.1173).abs() < 1e-9);
        assert!((pos.longitude() - 11.516666666).abs() < 1e-6);
        assert_eq!(pos.altitude(), Some(545.4));
        // 1994-03-23T12:35:19Z
        assert_eq!(pos.timestamp(), 764426119);
    }

    #[test]
    fn test_gprmc_parsing() {
        let mut parser = SentenceParser::new();
        let gprmc = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

        let pos = parser.parse(gprmc).unwrap();

        assert!((pos.latitude() - 48.1173).abs() < 1e-9);
        assert_eq!(pos.altitude(), None);
        assert_eq!(pos.timestamp(), 764426119);
        assert_eq!(parser.current_date(), Some(march_23_1994()));
    }

    #[test]
    fn test_southern_and_western_hemispheres() {
        let mut parser = SentenceParser::with_date(march_23_1994());
        let line = sentence("GNGGA,000000,2333.030,S,04637.998,W,1,08,0.9,760.0,M,0.0,M,,");

        let pos = parser.parse(&line).unwrap();

        assert!((pos.latitude() + 23.5505).abs() < 1e-9);
        assert!((pos.longitude() + 46.6333).abs() < 1e-9);
    }

    #[test]
    fn test_gga_takes_date_from_previous_rmc() {
        let mut parser = SentenceParser::new();
        let void_rmc = sentence("GPRMC,233130,V,,,,,,,130209,,");
        assert_eq!(parser.parse(&void_rmc), Err(Rejection::NoFix));

        let gga = sentence("GPGGA,233130,1000.000,N,02000.000,E,1,08,0.9,5.0,M,0.0,M,,");
        let pos = parser.parse(&gga).unwrap();

        assert_eq!(pos, Position::new(10.0, 20.0, Some(5.0), 1234567890).unwrap());
    }

    #[test]
    fn test_active_rmc_without_date_still_yields_fix() {
        let rmc = sentence("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,,003.1,W");

        let mut anchored = SentenceParser::with_date(march_23_1994());
        let pos = anchored.parse(&rmc).unwrap();
        assert!((pos.latitude() - 48.1173).abs() < 1e-9);
        assert_eq!(pos.timestamp(), 764426119);
        assert_eq!(anchored.current_date(), Some(march_23_1994()));

        let mut fresh = SentenceParser::new();
        let pos = fresh.parse(&rmc).unwrap();
        let today = Utc::now().date_naive();
        let day = pos.datetime().unwrap().date_naive();
        assert!(day == today || day.succ_opt() == Some(today));
        assert_eq!(fresh.current_date(), None);
    }

    #[test]
    fn test_non_finite_altitude_rejected() {
        let mut parser = SentenceParser::with_date(march_23_1994());
        for alt in ["NaN", "inf", "-inf"] {
            let gga = sentence(&format!(
                "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,{},M,46.9,M,,",
                alt
            ));
            assert_eq!(parser.parse(&gga), Err(Rejection::MalformedField("altitude")));
        }
    }

    #[test]
    fn test_fractional_seconds_truncated() {
        let mut parser = SentenceParser::with_date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        let gga = sentence("GPGGA,000001.95,0000.000,N,00000.000,E,1,04,1.0,,M,,M,,");
        let pos = parser.parse(&gga).unwrap();
        assert_eq!(pos.timestamp(), 1);
        assert_eq!(pos.altitude(), None);
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut parser = SentenceParser::new();
        let bad = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48";
        assert_eq!(
            parser.parse(bad),
            Err(Rejection::ChecksumMismatch { expected: 0x48, computed: 0x47 })
        );

        // Payload altered, checksum left alone
        let tampered = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.5,M,46.9,M,,*47";
        assert!(matches!(parser.parse(tampered), Err(Rejection::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_lowercase_checksum_accepted() {
        let mut parser = SentenceParser::new();
        let rmc = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6a";
        assert!(parser.parse(rmc).is_ok());
    }

    #[test]
    fn test_structural_rejections() {
        let mut parser = SentenceParser::new();
        assert!(matches!(parser.parse("GPGGA,1,2*00"), Err(Rejection::Malformed(_))));
        assert!(matches!(parser.parse("$GPGGA,1,2"), Err(Rejection::Malformed(_))));
        assert!(matches!(parser.parse("$GPGGA,1,2*0"), Err(Rejection::Malformed(_))));
        assert!(matches!(parser.parse("$GPGGA,1,2*ZZ"), Err(Rejection::Malformed(_))));
        assert!(matches!(parser.parse(&sentence("GP,1,2")), Err(Rejection::Malformed(_))));
    }

    #[test]
    fn test_unsupported_sentence_is_silent() {
        let mut parser = SentenceParser::new();
        let gsv = "$GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75";

        let err = parser.parse(gsv).unwrap_err();
        assert_eq!(err, Rejection::Unsupported("GSV".to_string()));
        assert!(err.is_silent());
    }

    #[test]
    fn test_no_fix_reported() {
        let mut parser = SentenceParser::new();
        let gga = sentence("GPGGA,123519,,,,,0,00,99.9,,M,,M,,");
        assert_eq!(parser.parse(&gga), Err(Rejection::NoFix));
    }

    #[test]
    fn test_missing_and_malformed_fields() {
        let mut parser = SentenceParser::with_date(march_23_1994());

        let no_lat = sentence("GPGGA,123519,,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&no_lat), Err(Rejection::MissingField("latitude")));

        let bad_lon = sentence("GPGGA,123519,4807.038,N,01x31.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&bad_lon), Err(Rejection::MalformedField("longitude")));

        let bad_hemi = sentence("GPGGA,123519,4807.038,Q,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&bad_hemi), Err(Rejection::MalformedField("latitude")));

        let bad_minutes = sentence("GPGGA,123519,4875.000,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&bad_minutes), Err(Rejection::MalformedField("latitude")));

        let bad_alt = sentence("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,high,M,46.9,M,,");
        assert_eq!(parser.parse(&bad_alt), Err(Rejection::MalformedField("altitude")));

        let bad_time = sentence("GPGGA,256199,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&bad_time), Err(Rejection::MalformedField("time")));

        let short = sentence("GPGGA,123519,4807.038,N");
        assert!(matches!(parser.parse(&short), Err(Rejection::MissingField(_))));

        let bad_date = sentence("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,320394,003.1,W");
        assert_eq!(parser.parse(&bad_date), Err(Rejection::MalformedField("date")));
    }

    #[test]
    fn test_latitude_beyond_pole_is_out_of_range() {
        let mut parser = SentenceParser::with_date(march_23_1994());
        let gga = sentence("GPGGA,123519,9130.000,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(parser.parse(&gga), Err(Rejection::OutOfRange));
    }

    #[test]
    fn test_decoded_coordinates_always_in_range() {
        let mut parser = SentenceParser::with_date(march_23_1994());
        for (lat, ns, lon, ew) in [
            ("0000.000", "N", "00000.000", "E"),
            ("9000.000", "S", "18000.000", "W"),
            ("8959.999", "N", "17959.999", "E"),
            ("4530.500", "S", "12015.250", "W"),
        ] {
            let gga = sentence(&format!(
                "GPGGA,101010,{},{},{},{},1,08,0.9,10.0,M,0.0,M,,",
                lat, ns, lon, ew
            ));
            let pos = parser.parse(&gga).unwrap();
            assert!((-90.0..=90.0).contains(&pos.latitude()));
            assert!((-180.0..=180.0).contains(&pos.longitude()));
        }
    }
}
