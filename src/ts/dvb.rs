//! DVB time and duration encodings (ETSI EN 300 468 Annex C).
//!
//! Wall-clock times travel as a 16-bit Modified Julian Date followed by
//! three BCD bytes (HH MM SS); durations are plain BCD byte runs.

use crate::error::{Result, TsError};
use crate::utils::{BitWriter, ByteReader};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::io;
use std::time::Duration;

fn parse_bcd(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0xF)
}

fn to_bcd(v: u8) -> u8 {
    (v / 10) << 4 | (v % 10)
}

/// Parses a 5-byte DVB time (16-bit MJD + BCD HH MM SS) into a UTC
/// wall-clock value
pub fn parse_dvb_time(r: &mut ByteReader<'_>) -> Result<NaiveDateTime> {
    let bs = r.next_bytes_nocopy(5)?;
    let mjd = f64::from(u16::from(bs[0]) << 8 | u16::from(bs[1]));

    // MJD to Y/M/D, ETSI EN 300 468 Annex C.
    let yt = ((mjd - 15078.2) / 365.25) as i64;
    let mt = ((mjd - 14956.1 - (yt as f64 * 365.25).trunc()) / 30.6001) as i64;
    let day = (mjd - 14956.0 - (yt as f64 * 365.25).trunc() - (mt as f64 * 30.6001).trunc()) as u32;
    let k = i64::from(mt == 14 || mt == 15);
    let year = (yt + k) as i32 + 1900;
    let month = (mt - 1 - k * 12) as u32;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| TsError::InvalidData(format!("invalid DVB date {year}-{month}-{day}")))?;
    date.and_hms_opt(
        u32::from(parse_bcd(bs[2])),
        u32::from(parse_bcd(bs[3])),
        u32::from(parse_bcd(bs[4])),
    )
    .ok_or_else(|| TsError::InvalidData("invalid DVB time of day".to_string()))
}

/// Serializes a wall-clock value as a 5-byte DVB time
pub fn write_dvb_time<W: io::Write>(w: &mut BitWriter<W>, t: &NaiveDateTime) -> Result<usize> {
    let year = i64::from(t.year()) - 1900;
    let month = i64::from(t.month());
    let day = i64::from(t.day());
    let l = i64::from(month == 1 || month == 2);
    let mjd = 14956
        + day
        + ((year - l) as f64 * 365.25).trunc() as i64
        + ((month + 1 + l * 12) as f64 * 30.6001).trunc() as i64;

    w.write_u16(mjd as u16);
    w.write_byte(to_bcd(t.hour() as u8));
    w.write_byte(to_bcd(t.minute() as u8));
    w.write_byte(to_bcd(t.second() as u8));
    w.status()?;
    Ok(5)
}

/// Parses a 2-byte BCD duration (HH MM)
pub fn parse_dvb_duration_minutes(r: &mut ByteReader<'_>) -> Result<Duration> {
    let bs = r.next_bytes_nocopy(2)?;
    Ok(Duration::from_secs(
        u64::from(parse_bcd(bs[0])) * 3600 + u64::from(parse_bcd(bs[1])) * 60,
    ))
}

/// Serializes a duration as 2 BCD bytes (HH MM); seconds are truncated
pub fn write_dvb_duration_minutes<W: io::Write>(
    w: &mut BitWriter<W>,
    d: &Duration,
) -> Result<usize> {
    let secs = d.as_secs();
    w.write_byte(to_bcd((secs / 3600) as u8));
    w.write_byte(to_bcd((secs % 3600 / 60) as u8));
    w.status()?;
    Ok(2)
}

/// Parses a 3-byte BCD duration (HH MM SS)
pub fn parse_dvb_duration_seconds(r: &mut ByteReader<'_>) -> Result<Duration> {
    let bs = r.next_bytes_nocopy(3)?;
    Ok(Duration::from_secs(
        u64::from(parse_bcd(bs[0])) * 3600
            + u64::from(parse_bcd(bs[1])) * 60
            + u64::from(parse_bcd(bs[2])),
    ))
}

/// Serializes a duration as 3 BCD bytes (HH MM SS)
pub fn write_dvb_duration_seconds<W: io::Write>(
    w: &mut BitWriter<W>,
    d: &Duration,
) -> Result<usize> {
    let secs = d.as_secs();
    w.write_byte(to_bcd((secs / 3600) as u8));
    w.write_byte(to_bcd((secs % 3600 / 60) as u8));
    w.write_byte(to_bcd((secs % 60) as u8));
    w.status()?;
    Ok(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_dvb_time_annex_c_example() {
        // The EN 300 468 worked example: 1993-10-13 12:45:00 is MJD 0xC079.
        let mut r = ByteReader::new(&[0xC0, 0x79, 0x12, 0x45, 0x00]);
        assert_eq!(parse_dvb_time(&mut r).unwrap(), dt(1993, 10, 13, 12, 45, 0));
    }

    #[test]
    fn test_write_dvb_time_annex_c_example() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        write_dvb_time(&mut w, &dt(1993, 10, 13, 12, 45, 0)).unwrap();
        assert_eq!(out, [0xC0, 0x79, 0x12, 0x45, 0x00]);
    }

    #[test]
    fn test_dvb_time_round_trip_january() {
        // January/February exercise the month-14/15 leg of the MJD math.
        let t = dt(2000, 1, 1, 23, 59, 59);
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        write_dvb_time(&mut w, &t).unwrap();
        assert_eq!(&out[..2], &[0xC9, 0x58]); // MJD 51544
        let mut r = ByteReader::new(&out);
        assert_eq!(parse_dvb_time(&mut r).unwrap(), t);
    }

    #[test]
    fn test_duration_minutes_round_trip() {
        let mut r = ByteReader::new(&[0x02, 0x30]);
        let d = parse_dvb_duration_minutes(&mut r).unwrap();
        assert_eq!(d, Duration::from_secs(2 * 3600 + 30 * 60));

        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        write_dvb_duration_minutes(&mut w, &d).unwrap();
        assert_eq!(out, [0x02, 0x30]);
    }

    #[test]
    fn test_duration_seconds_round_trip() {
        let d = Duration::from_secs(12 * 3600 + 34 * 60 + 56);
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        write_dvb_duration_seconds(&mut w, &d).unwrap();
        assert_eq!(out, [0x12, 0x34, 0x56]);
        let mut r = ByteReader::new(&out);
        assert_eq!(parse_dvb_duration_seconds(&mut r).unwrap(), d);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        // MJD 0 is 1858-11-17, far below what the DVB formula covers.
        let mut r = ByteReader::new(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(parse_dvb_time(&mut r).is_err());
    }
}
