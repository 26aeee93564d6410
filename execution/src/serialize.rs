//! Binary serialization.
//!
//! Two distinct formats, per the data model: open orders persist as an opaque adapter-chosen
//! body keyed by order id (the adapter owns the layout, we only carry the envelope); fills
//! persist in a fixed framed layout so that positions are reconstructible without the adapter
//! being loaded.

use crate::fill::{Fill, InstrumentSnapshot};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use vantage_markets::{InstrumentKind, Side};

/// The envelope persisted for an open order: `{id, opaque_adapter_body}`. The body's layout is
/// chosen by whichever Exchange adapter produced it; this crate never interprets it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedOrder {
    pub order_id: String,
    pub order_content: Vec<u8>,
}

impl SerializedOrder {
    pub fn is_empty(&self) -> bool {
        self.order_id.is_empty() && self.order_content.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum FillCodecError {
    #[error("truncated fill frame")]
    Truncated,
    #[error("fill field was not valid utf-8")]
    InvalidUtf8,
    #[error("unrecognized instrument kind tag {0}")]
    UnknownInstrumentKind(u8),
    #[error("unrecognized side tag {0}")]
    UnknownSide(i8),
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            break;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn get_varint(buf: &mut Bytes) -> Result<u64, FillCodecError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        if !buf.has_remaining() {
            return Err(FillCodecError::Truncated);
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    put_varint(buf, s.len() as u64);
    buf.put_slice(s.as_bytes());
}

fn get_string(buf: &mut Bytes) -> Result<String, FillCodecError> {
    let len = get_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(FillCodecError::Truncated);
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| FillCodecError::InvalidUtf8)
}

fn instrument_kind_tag(kind: InstrumentKind) -> u8 {
    match kind {
        InstrumentKind::Spot => 0,
        InstrumentKind::LinearContract => 1,
        InstrumentKind::InverseContract => 2,
        InstrumentKind::QuantumContract => 3,
        InstrumentKind::Cfd => 4,
    }
}

fn instrument_kind_from_tag(tag: u8) -> Result<InstrumentKind, FillCodecError> {
    match tag {
        0 => Ok(InstrumentKind::Spot),
        1 => Ok(InstrumentKind::LinearContract),
        2 => Ok(InstrumentKind::InverseContract),
        3 => Ok(InstrumentKind::QuantumContract),
        4 => Ok(InstrumentKind::Cfd),
        other => Err(FillCodecError::UnknownInstrumentKind(other)),
    }
}

fn side_tag(side: Side) -> i8 {
    match side {
        Side::Sell => -1,
        Side::Buy => 1,
    }
}

fn side_from_tag(tag: i8) -> Result<Side, FillCodecError> {
    match tag {
        -1 => Ok(Side::Sell),
        1 => Ok(Side::Buy),
        other => Err(FillCodecError::UnknownSide(other)),
    }
}

/// Encodes a [`Fill`] as a varint-length-prefixed tuple, fields in the fixed order:
/// timestamp (i64 ns), id, label, pos_id, instrument.kind (u8), multiplier (f64),
/// instrument_id, price_unit, side (i8), price (f64), amount (f64), fees (f64).
pub fn encode_fill(fill: &Fill) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i64(fill.time.timestamp_nanos_opt().unwrap_or(0));
    put_str(&mut buf, &fill.id);
    put_str(&mut buf, &fill.label);
    put_str(&mut buf, &fill.pos_id.to_string());
    buf.put_u8(instrument_kind_tag(fill.instrument.kind));
    buf.put_f64(fill.instrument.multiplier.to_f64().unwrap_or(0.0));
    put_str(&mut buf, &fill.instrument.instrument_id);
    put_str(&mut buf, &fill.instrument.price_unit);
    buf.put_i8(side_tag(fill.side));
    buf.put_f64(fill.price.to_f64().unwrap_or(0.0));
    buf.put_f64(fill.amount.to_f64().unwrap_or(0.0));
    buf.put_f64(fill.fees.to_f64().unwrap_or(0.0));
    buf.freeze()
}

pub fn decode_fill(mut bytes: Bytes) -> Result<Fill, FillCodecError> {
    if bytes.remaining() < 8 {
        return Err(FillCodecError::Truncated);
    }
    let ts_ns = bytes.get_i64();
    let secs = ts_ns.div_euclid(1_000_000_000);
    let nanos = ts_ns.rem_euclid(1_000_000_000) as u32;
    let time: DateTime<Utc> = DateTime::from_timestamp(secs, nanos)
        .unwrap_or_else(|| DateTime::from_timestamp(0, 0).expect("epoch is valid"));
    let id = get_string(&mut bytes)?;
    let label = get_string(&mut bytes)?;
    let pos_id = get_string(&mut bytes)?
        .parse()
        .map_err(|_| FillCodecError::Truncated)?;
    if bytes.remaining() < 1 {
        return Err(FillCodecError::Truncated);
    }
    let kind = instrument_kind_from_tag(bytes.get_u8())?;
    if bytes.remaining() < 8 {
        return Err(FillCodecError::Truncated);
    }
    let multiplier = Decimal::try_from(bytes.get_f64()).unwrap_or(Decimal::ZERO);
    let instrument_id = get_string(&mut bytes)?;
    let price_unit = get_string(&mut bytes)?;
    if bytes.remaining() < 1 {
        return Err(FillCodecError::Truncated);
    }
    let side = side_from_tag(bytes.get_i8())?;
    if bytes.remaining() < 24 {
        return Err(FillCodecError::Truncated);
    }
    let price = Decimal::try_from(bytes.get_f64()).unwrap_or(Decimal::ZERO);
    let amount = Decimal::try_from(bytes.get_f64()).unwrap_or(Decimal::ZERO);
    let fees = Decimal::try_from(bytes.get_f64()).unwrap_or(Decimal::ZERO);

    Ok(Fill {
        time,
        id,
        label,
        pos_id,
        instrument: InstrumentSnapshot {
            kind,
            multiplier,
            instrument_id,
            price_unit,
        },
        side,
        price,
        amount,
        fees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Fill {
        Fill {
            time: DateTime::from_timestamp(1_700_000_000, 123_000_000).unwrap(),
            id: "F1".into(),
            label: "entry".into(),
            pos_id: 42,
            instrument: InstrumentSnapshot {
                kind: InstrumentKind::LinearContract,
                multiplier: dec!(10),
                instrument_id: "WINFUT".into(),
                price_unit: "BRL".into(),
            },
            side: Side::Sell,
            price: dec!(118500.5),
            amount: dec!(1),
            fees: dec!(0.25),
        }
    }

    #[test]
    fn round_trips_through_the_wire_format() {
        let fill = sample();
        let encoded = encode_fill(&fill);
        let decoded = decode_fill(encoded).expect("decodes");
        assert_eq!(decoded.id, fill.id);
        assert_eq!(decoded.label, fill.label);
        assert_eq!(decoded.pos_id, fill.pos_id);
        assert_eq!(decoded.instrument.kind, fill.instrument.kind);
        assert_eq!(decoded.instrument.instrument_id, fill.instrument.instrument_id);
        assert_eq!(decoded.side, fill.side);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let encoded = encode_fill(&sample());
        let truncated = encoded.slice(0..encoded.len() - 4);
        assert!(decode_fill(truncated).is_err());
    }
}
