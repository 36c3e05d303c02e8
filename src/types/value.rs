//! Tagged values and their typed projections
//!
//! Every value on the wire is an int type tag followed by a payload whose
//! shape depends on the tag. [`Value`] is the decoded form. Reading it as a
//! particular Rust type goes through one `to_*` projection per target; each
//! projection accepts the kinds that convert without losing meaning and
//! fails with [`Error::TypeMismatch`] for everything else.

use std::fmt;

use bytes::Bytes;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{DbType, ParamMode};
use crate::error::{Error, Result};
use crate::types::{Lob, LobKind, Numeric, Oid, ResultSetRef};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A SET, MULTISET or SEQUENCE of nested values
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    kind: DbType,
    elements: Vec<Value>,
}

impl Collection {
    /// Create a collection of the given kind
    pub fn new(kind: DbType, elements: Vec<Value>) -> Result<Self> {
        if !kind.is_collection() {
            return Err(Error::InvalidArgument(format!("{:?} is not a collection type", kind)));
        }
        Ok(Self { kind, elements })
    }

    /// Create an ordered sequence
    pub fn sequence(elements: Vec<Value>) -> Self {
        Self {
            kind: DbType::Sequence,
            elements,
        }
    }

    /// Collection kind tag
    pub fn kind(&self) -> DbType {
        self.kind
    }

    /// Elements in wire order
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the collection has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A value decoded from or destined for the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// SHORT
    Short(i16),
    /// INTEGER
    Int(i32),
    /// BIGINT
    BigInt(i64),
    /// FLOAT
    Float(f32),
    /// DOUBLE
    Double(f64),
    /// MONETARY amount
    Monetary(f64),
    /// NUMERIC (exact decimal)
    Numeric(Numeric),
    /// STRING or CHAR
    String(String),
    /// BIT or VARBIT
    Bytes(Bytes),
    /// DATE
    Date(NaiveDate),
    /// TIME
    Time(NaiveTime),
    /// TIMESTAMP (second precision)
    Timestamp(NaiveDateTime),
    /// DATETIME (millisecond precision)
    Datetime(NaiveDateTime),
    /// SET, MULTISET or SEQUENCE
    Collection(Collection),
    /// Object reference
    Oid(Oid),
    /// BLOB or CLOB handle
    Lob(Lob),
    /// Query result returned as a value
    ResultSet(ResultSetRef),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's kind, used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Short(_) => "Short",
            Value::Int(_) => "Int",
            Value::BigInt(_) => "BigInt",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Monetary(_) => "Monetary",
            Value::Numeric(_) => "Numeric",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::Timestamp(_) => "Timestamp",
            Value::Datetime(_) => "Datetime",
            Value::Collection(_) => "Collection",
            Value::Oid(_) => "Oid",
            Value::Lob(lob) => match lob.kind() {
                LobKind::Blob => "Blob",
                LobKind::Clob => "Clob",
            },
            Value::ResultSet(_) => "ResultSet",
        }
    }

    /// Type tag this value is sent with
    pub fn db_type(&self) -> DbType {
        match self {
            Value::Null => DbType::Null,
            Value::Short(_) => DbType::Short,
            Value::Int(_) => DbType::Int,
            Value::BigInt(_) => DbType::BigInt,
            Value::Float(_) => DbType::Float,
            Value::Double(_) => DbType::Double,
            Value::Monetary(_) => DbType::Monetary,
            Value::Numeric(_) => DbType::Numeric,
            Value::String(_) => DbType::String,
            Value::Bytes(_) => DbType::VarBit,
            Value::Date(_) => DbType::Date,
            Value::Time(_) => DbType::Time,
            Value::Timestamp(_) => DbType::Timestamp,
            Value::Datetime(_) => DbType::Datetime,
            Value::Collection(c) => c.kind(),
            Value::Oid(_) => DbType::Object,
            Value::Lob(lob) => lob.kind().db_type(),
            Value::ResultSet(_) => DbType::ResultSet,
        }
    }

    fn mismatch(&self, to: &'static str) -> Error {
        match self {
            Value::Null => Error::UnexpectedNull,
            _ => Error::TypeMismatch {
                from: self.kind_name(),
                to,
            },
        }
    }

    // =========================================================================
    // Numeric projections
    // =========================================================================

    fn integral(&self, to: &'static str) -> Result<i64> {
        match self {
            Value::Short(v) => Ok(*v as i64),
            Value::Int(v) => Ok(*v as i64),
            Value::BigInt(v) => Ok(*v),
            Value::Float(v) => float_to_i64(*v as f64),
            Value::Double(v) | Value::Monetary(v) => float_to_i64(*v),
            Value::Numeric(n) => n.to_i64(),
            Value::String(s) => parse_integer(s),
            _ => Err(self.mismatch(to)),
        }
    }

    /// Project to i16, range checked
    pub fn to_i16(&self) -> Result<i16> {
        let v = self.integral("i16")?;
        i16::try_from(v).map_err(|_| Error::ValueConversion(format!("{} does not fit i16", v)))
    }

    /// Project to i32, range checked
    pub fn to_i32(&self) -> Result<i32> {
        let v = self.integral("i32")?;
        i32::try_from(v).map_err(|_| Error::ValueConversion(format!("{} does not fit i32", v)))
    }

    /// Project to i64
    pub fn to_i64(&self) -> Result<i64> {
        self.integral("i64")
    }

    /// Project to f64
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Short(v) => Ok(*v as f64),
            Value::Int(v) => Ok(*v as f64),
            Value::BigInt(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v as f64),
            Value::Double(v) | Value::Monetary(v) => Ok(*v),
            Value::Numeric(n) => n.to_f64(),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::ValueConversion(format!("cannot parse {:?} as a number", s))),
            _ => Err(self.mismatch("f64")),
        }
    }

    /// Project to f32, range checked
    pub fn to_f32(&self) -> Result<f32> {
        let v = match self {
            Value::Float(v) => return Ok(*v),
            Value::Null => return Err(Error::UnexpectedNull),
            _ if self.integral_or_float() => self.to_f64()?,
            _ => return Err(self.mismatch("f32")),
        };
        if v.is_finite() && v.abs() > f32::MAX as f64 {
            return Err(Error::ValueConversion(format!("{} does not fit f32", v)));
        }
        Ok(v as f32)
    }

    fn integral_or_float(&self) -> bool {
        matches!(
            self,
            Value::Short(_)
                | Value::Int(_)
                | Value::BigInt(_)
                | Value::Double(_)
                | Value::Monetary(_)
                | Value::Numeric(_)
                | Value::String(_)
        )
    }

    /// Project to an exact decimal
    pub fn to_numeric(&self) -> Result<Numeric> {
        match self {
            Value::Short(v) => Ok(Numeric::from_i64(*v as i64)),
            Value::Int(v) => Ok(Numeric::from_i64(*v as i64)),
            Value::BigInt(v) => Ok(Numeric::from_i64(*v)),
            Value::Float(v) => Numeric::from_f64(*v as f64),
            Value::Double(v) | Value::Monetary(v) => Numeric::from_f64(*v),
            Value::Numeric(n) => Ok(n.clone()),
            Value::String(s) => Numeric::parse(s),
            _ => Err(self.mismatch("Numeric")),
        }
    }

    // =========================================================================
    // Text and binary projections
    // =========================================================================

    /// Project to text
    ///
    /// Scalars, dates and OIDs have a text form; bytes render as upper-case
    /// hex. Collections, LOB handles and result sets do not.
    pub fn to_string_value(&self) -> Result<String> {
        match self {
            Value::Null | Value::Collection(_) | Value::Lob(_) | Value::ResultSet(_) => {
                Err(self.mismatch("String"))
            }
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }

    /// Project to raw bytes
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(self.mismatch("Bytes")),
        }
    }

    // =========================================================================
    // Date and time projections
    // =========================================================================

    /// Project to a date
    pub fn to_date(&self) -> Result<NaiveDate> {
        match self {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) | Value::Datetime(ts) => Ok(ts.date()),
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .or_else(|_| parse_datetime_text(s).map(|dt| dt.date()))
                .map_err(|_| Error::ValueConversion(format!("cannot parse {:?} as a date", s))),
            _ => Err(self.mismatch("Date")),
        }
    }

    /// Project to a time of day
    pub fn to_time(&self) -> Result<NaiveTime> {
        match self {
            Value::Time(t) => Ok(*t),
            Value::Timestamp(ts) | Value::Datetime(ts) => Ok(ts.time()),
            Value::String(s) => NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
                .map_err(|_| Error::ValueConversion(format!("cannot parse {:?} as a time", s))),
            _ => Err(self.mismatch("Time")),
        }
    }

    /// Project to a second-precision timestamp
    pub fn to_timestamp(&self) -> Result<NaiveDateTime> {
        let dt = match self {
            Value::Timestamp(ts) => return Ok(*ts),
            Value::Datetime(dt) => *dt,
            Value::Date(d) => d.and_time(NaiveTime::MIN),
            Value::String(s) => parse_datetime_text(s)?,
            _ => return Err(self.mismatch("Timestamp")),
        };
        Ok(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Project to a millisecond-precision datetime
    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        match self {
            Value::Datetime(dt) | Value::Timestamp(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::String(s) => parse_datetime_text(s),
            _ => Err(self.mismatch("Datetime")),
        }
    }

    // =========================================================================
    // Reference projections
    // =========================================================================

    /// Project a collection to its elements
    pub fn to_object_array(&self) -> Result<Vec<Value>> {
        match self {
            Value::Collection(c) => Ok(c.elements.clone()),
            _ => Err(self.mismatch("Collection")),
        }
    }

    /// Project to an object identifier
    pub fn to_oid(&self) -> Result<Oid> {
        match self {
            Value::Oid(oid) => Ok(oid.clone()),
            _ => Err(self.mismatch("Oid")),
        }
    }

    /// Project to a LOB handle
    pub fn to_lob(&self) -> Result<Lob> {
        match self {
            Value::Lob(lob) => Ok(lob.clone()),
            _ => Err(self.mismatch("Lob")),
        }
    }

    /// Project to a CLOB handle
    pub fn to_clob(&self) -> Result<Lob> {
        match self {
            Value::Lob(lob) if lob.kind() == LobKind::Clob => Ok(lob.clone()),
            _ => Err(self.mismatch("Clob")),
        }
    }

    /// Project to a result set reference
    pub fn to_result_set(&self) -> Result<ResultSetRef> {
        match self {
            Value::ResultSet(rs) => Ok(*rs),
            _ => Err(self.mismatch("ResultSet")),
        }
    }

    // =========================================================================
    // Wire encoding
    // =========================================================================

    /// Write the type tag and payload
    pub fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.db_type() as i32)?;
        self.encode_payload(buf)
    }

    fn encode_payload(&self, buf: &mut WriteBuffer) -> Result<()> {
        match self {
            Value::Null => Ok(()),
            Value::Short(v) => buf.write_short(*v),
            Value::Int(v) => buf.write_i32(*v),
            Value::BigInt(v) => buf.write_i64(*v),
            Value::Float(v) => buf.write_f32(*v),
            Value::Double(v) | Value::Monetary(v) => buf.write_f64(*v),
            Value::Numeric(n) => buf.write_string(n.as_str()),
            Value::String(s) => buf.write_string(s),
            Value::Bytes(b) => buf.write_bytes_with_length(b),
            Value::Date(d) => {
                buf.write_i32(d.year())?;
                buf.write_i32(d.month() as i32)?;
                buf.write_i32(d.day() as i32)
            }
            Value::Time(t) => write_time(buf, t),
            Value::Timestamp(ts) => {
                write_date_part(buf, ts)?;
                write_time(buf, &ts.time())
            }
            Value::Datetime(dt) => {
                write_date_part(buf, dt)?;
                write_time(buf, &dt.time())?;
                buf.write_i32((dt.nanosecond() / 1_000_000) as i32)
            }
            Value::Collection(c) => {
                buf.write_i32(c.elements.len() as i32)?;
                for element in &c.elements {
                    element.encode(buf)?;
                }
                Ok(())
            }
            Value::Oid(oid) => buf.write_oid(oid),
            Value::Lob(lob) => {
                buf.write_i64(lob.size())?;
                buf.write_string(lob.locator())
            }
            Value::ResultSet(rs) => buf.write_i64(rs.query_id()),
        }
    }

    /// Read a tagged value, failing on either wire or conversion errors
    pub fn decode(buf: &mut ReadBuffer) -> Result<Value> {
        Self::decode_checked(buf)?
    }

    /// Read a tagged value, keeping conversion errors separate
    ///
    /// The outer error means the stream cannot be trusted any more. The
    /// inner one belongs to this value only: its bytes were fully consumed
    /// and decoding can continue with the next item.
    pub fn decode_checked(buf: &mut ReadBuffer) -> Result<Result<Value>> {
        let db_type = DbType::try_from(buf.read_i32()?)?;
        Self::decode_payload(buf, db_type)
    }

    /// Read a payload whose tag is already known
    pub fn decode_payload(buf: &mut ReadBuffer, db_type: DbType) -> Result<Result<Value>> {
        let value = match db_type {
            DbType::Null => Value::Null,
            DbType::Short => Value::Short(buf.read_short()?),
            DbType::Int => Value::Int(buf.read_i32()?),
            DbType::BigInt => Value::BigInt(buf.read_i64()?),
            DbType::Float => Value::Float(buf.read_f32()?),
            DbType::Double => Value::Double(buf.read_f64()?),
            DbType::Monetary => Value::Monetary(buf.read_f64()?),
            DbType::Numeric => {
                return Ok(match read_text(buf)? {
                    Some(Ok(text)) => Numeric::parse(&text).map(Value::Numeric),
                    Some(Err(e)) => Err(e),
                    None => Ok(Value::Null),
                })
            }
            DbType::String | DbType::Char => {
                return Ok(match read_text(buf)? {
                    Some(text) => text.map(Value::String),
                    None => Ok(Value::Null),
                })
            }
            DbType::Bit | DbType::VarBit => match buf.read_bytes_with_length()? {
                Some(b) => Value::Bytes(b),
                None => Value::Null,
            },
            DbType::Date => {
                let (y, m, d) = (buf.read_i32()?, buf.read_i32()?, buf.read_i32()?);
                return Ok(make_date(y, m, d).map(Value::Date));
            }
            DbType::Time => {
                let (h, mi, s) = (buf.read_i32()?, buf.read_i32()?, buf.read_i32()?);
                return Ok(make_time(h, mi, s, 0).map(Value::Time));
            }
            DbType::Timestamp => {
                let mut f = [0i32; 6];
                for slot in f.iter_mut() {
                    *slot = buf.read_i32()?;
                }
                return Ok(make_date(f[0], f[1], f[2])
                    .and_then(|d| Ok(d.and_time(make_time(f[3], f[4], f[5], 0)?)))
                    .map(Value::Timestamp));
            }
            DbType::Datetime => {
                let mut f = [0i32; 7];
                for slot in f.iter_mut() {
                    *slot = buf.read_i32()?;
                }
                return Ok(make_date(f[0], f[1], f[2])
                    .and_then(|d| Ok(d.and_time(make_time(f[3], f[4], f[5], f[6])?)))
                    .map(Value::Datetime));
            }
            DbType::Set | DbType::Multiset | DbType::Sequence => {
                let count = buf.read_count()?;
                let mut elements = Vec::with_capacity(count.min(1024));
                let mut first_error = None;
                for _ in 0..count {
                    match Self::decode_checked(buf)? {
                        Ok(v) => elements.push(v),
                        Err(e) => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                return Ok(match first_error {
                    Some(e) => Err(e),
                    None => Ok(Value::Collection(Collection {
                        kind: db_type,
                        elements,
                    })),
                });
            }
            DbType::Object => {
                let oid = buf.read_oid()?;
                if oid.is_null() {
                    Value::Null
                } else {
                    Value::Oid(oid)
                }
            }
            DbType::ResultSet => Value::ResultSet(ResultSetRef::new(buf.read_i64()?)),
            DbType::Blob | DbType::Clob => {
                let size = buf.read_i64()?;
                let kind = if db_type == DbType::Blob {
                    LobKind::Blob
                } else {
                    LobKind::Clob
                };
                match buf.read_string()? {
                    Some(locator) => Value::Lob(Lob::new(kind, size, locator)),
                    None => Value::Null,
                }
            }
        };
        Ok(Ok(value))
    }
}

/// Read a packed string, separating bad UTF-8 from stream errors
fn read_text(buf: &mut ReadBuffer) -> Result<Option<Result<String>>> {
    Ok(buf.read_string_bytes()?.map(|bytes| {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::ValueConversion(format!("invalid UTF-8 in string: {}", e)))
    }))
}

fn write_date_part(buf: &mut WriteBuffer, dt: &NaiveDateTime) -> Result<()> {
    buf.write_i32(dt.year())?;
    buf.write_i32(dt.month() as i32)?;
    buf.write_i32(dt.day() as i32)
}

fn write_time(buf: &mut WriteBuffer, t: &NaiveTime) -> Result<()> {
    buf.write_i32(t.hour() as i32)?;
    buf.write_i32(t.minute() as i32)?;
    buf.write_i32(t.second() as i32)
}

fn make_date(y: i32, m: i32, d: i32) -> Result<NaiveDate> {
    u32::try_from(m)
        .ok()
        .zip(u32::try_from(d).ok())
        .and_then(|(m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .ok_or_else(|| Error::ValueConversion(format!("invalid date {}-{}-{}", y, m, d)))
}

fn make_time(h: i32, mi: i32, s: i32, ms: i32) -> Result<NaiveTime> {
    let time = match [h, mi, s, ms].map(|v| u32::try_from(v).ok()) {
        [Some(h), Some(mi), Some(s), Some(ms)] => NaiveTime::from_hms_milli_opt(h, mi, s, ms),
        _ => None,
    };
    time.ok_or_else(|| Error::ValueConversion(format!("invalid time {}:{}:{}.{}", h, mi, s, ms)))
}

fn float_to_i64(v: f64) -> Result<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let t = v.trunc();
    if !t.is_finite() || t >= LIMIT || t < -LIMIT {
        return Err(Error::ValueConversion(format!("{} does not fit i64", v)));
    }
    Ok(t as i64)
}

fn parse_integer(s: &str) -> Result<i64> {
    let text = s.trim();
    match text.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(_) => Numeric::parse(text)
            .and_then(|n| n.to_i64())
            .map_err(|_| Error::ValueConversion(format!("cannot parse {:?} as an integer", s))),
    }
}

fn parse_datetime_text(s: &str) -> Result<NaiveDateTime> {
    let text = s.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT))
        .or_else(|_| NaiveDate::parse_from_str(text, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| Error::ValueConversion(format!("cannot parse {:?} as a datetime", s)))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) | Value::Monetary(v) => write!(f, "{}", v),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", hex::encode_upper(b)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Datetime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Collection(c) => {
                write!(f, "{{")?;
                for (i, v) in c.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            Value::Oid(oid) => write!(f, "{}", oid),
            Value::Lob(lob) => write!(f, "<{}:{} bytes>", self.kind_name(), lob.size()),
            Value::ResultSet(rs) => write!(f, "<ResultSet:{}>", rs.query_id()),
        }
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<Numeric> for Value {
    fn from(v: Numeric) -> Self {
        Value::Numeric(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Datetime(v)
    }
}

impl From<Oid> for Value {
    fn from(v: Oid) -> Self {
        Value::Oid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A value together with its declared direction and type
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Direction
    pub mode: ParamMode,
    /// Declared type (what the engine expects back for OUT parameters)
    pub db_type: DbType,
    /// Current value (NULL for pure OUT parameters)
    pub value: Value,
}

impl Param {
    /// Create an IN parameter, typed by its value
    pub fn input(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            mode: ParamMode::In,
            db_type: value.db_type(),
            value,
        }
    }

    /// Create an OUT parameter of the given type
    pub fn output(db_type: DbType) -> Self {
        Self {
            mode: ParamMode::Out,
            db_type,
            value: Value::Null,
        }
    }

    /// Create an IN OUT parameter, typed by its value
    pub fn in_out(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            mode: ParamMode::InOut,
            db_type: value.db_type(),
            value,
        }
    }

    /// Write mode, declared type and tagged value
    pub fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.mode as i32)?;
        buf.write_i32(self.db_type as i32)?;
        self.value.encode(buf)
    }

    /// Read mode, declared type and tagged value
    pub fn decode(buf: &mut ReadBuffer) -> Result<Self> {
        let mode = ParamMode::try_from(buf.read_i32()?)?;
        let db_type = DbType::try_from(buf.read_i32()?)?;
        let value = Value::decode(buf)?;
        Ok(Self {
            mode,
            db_type,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &Value) -> Value {
        let mut buf = WriteBuffer::new();
        value.encode(&mut buf).unwrap();
        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let decoded = Value::decode(&mut read).unwrap();
        assert!(read.expect_consumed("test").is_ok());
        decoded
    }

    #[test]
    fn test_int_projections() {
        let v = Value::Int(42);
        assert_eq!(v.to_i32().unwrap(), 42);
        assert_eq!(v.to_i64().unwrap(), 42);
        assert_eq!(v.to_f64().unwrap(), 42.0);
        assert_eq!(v.to_string_value().unwrap(), "42");
        assert_eq!(v.to_numeric().unwrap().as_str(), "42");
    }

    #[test]
    fn test_int_to_date_is_mismatch() {
        let err = Value::Int(42).to_date().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { from: "Int", to: "Date" }));
    }

    #[test]
    fn test_narrowing_range_checked() {
        assert!(matches!(Value::BigInt(1 << 40).to_i32(), Err(Error::ValueConversion(_))));
        assert!(matches!(Value::Int(70000).to_i16(), Err(Error::ValueConversion(_))));
        assert_eq!(Value::Double(12.9).to_i32().unwrap(), 12);
        assert!(Value::Double(f64::NAN).to_i64().is_err());
        assert!(Value::Double(1e300).to_f32().is_err());
    }

    #[test]
    fn test_string_parses_to_numbers() {
        assert_eq!(Value::from(" 17 ").to_i32().unwrap(), 17);
        assert_eq!(Value::from("2.5").to_f64().unwrap(), 2.5);
        assert_eq!(Value::from("-3.75").to_numeric().unwrap().as_str(), "-3.75");
        assert!(matches!(Value::from("abc").to_i32(), Err(Error::ValueConversion(_))));
    }

    #[test]
    fn test_null_fails_every_projection() {
        let v = Value::Null;
        assert!(matches!(v.to_i32(), Err(Error::UnexpectedNull)));
        assert!(matches!(v.to_string_value(), Err(Error::UnexpectedNull)));
        assert!(matches!(v.to_date(), Err(Error::UnexpectedNull)));
        assert!(matches!(v.to_oid(), Err(Error::UnexpectedNull)));
        assert!(matches!(v.to_f32(), Err(Error::UnexpectedNull)));
    }

    #[test]
    fn test_date_projections() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_milli_opt(13, 5, 7, 250)
            .unwrap();
        let v = Value::Datetime(dt);
        assert_eq!(v.to_date().unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(v.to_time().unwrap(), NaiveTime::from_hms_opt(13, 5, 7).unwrap().with_nanosecond(250_000_000).unwrap());
        assert_eq!(v.to_timestamp().unwrap().nanosecond(), 0);
        assert_eq!(v.to_string_value().unwrap(), "2024-02-29 13:05:07.250");
        assert!(matches!(v.to_i64(), Err(Error::TypeMismatch { .. })));

        let parsed = Value::from("2024-02-29").to_timestamp().unwrap();
        assert_eq!(parsed.date(), dt.date());
    }

    #[test]
    fn test_bytes_render_as_hex() {
        let v = Value::from(vec![0xde, 0xad]);
        assert_eq!(v.to_string_value().unwrap(), "DEAD");
        assert!(Value::from("DEAD").to_bytes().is_err());
    }

    #[test]
    fn test_collection_projection() {
        let v = Value::Collection(Collection::sequence(vec![Value::Int(1), Value::from("a")]));
        assert_eq!(v.to_object_array().unwrap().len(), 2);
        assert!(v.to_string_value().is_err());
        assert_eq!(v.to_string(), "{1, a}");
        assert!(Collection::new(DbType::Int, vec![]).is_err());
    }

    #[test]
    fn test_reference_projections() {
        let clob = Value::Lob(Lob::new(LobKind::Clob, 10, "loc"));
        assert!(clob.to_clob().is_ok());
        assert!(Value::Lob(Lob::new(LobKind::Blob, 10, "loc")).to_clob().is_err());
        assert_eq!(Value::ResultSet(ResultSetRef::new(9)).to_result_set().unwrap().query_id(), 9);
        assert!(Value::Int(1).to_result_set().is_err());
    }

    #[test]
    fn test_wire_roundtrip_mixed() {
        let values = vec![
            Value::Short(-5),
            Value::BigInt(i64::MIN),
            Value::Numeric(Numeric::parse("123.450").unwrap()),
            Value::from("hello"),
            Value::Time(NaiveTime::from_hms_opt(23, 59, 58).unwrap()),
            Value::Collection(Collection::sequence(vec![Value::Int(1), Value::Null])),
            Value::Oid(Oid::new(10, 2, 0)),
            Value::Lob(Lob::new(LobKind::Blob, 4, "file:x")),
        ];
        for v in &values {
            assert_eq!(&roundtrip(v), v);
        }
    }

    #[test]
    fn test_bad_date_is_value_local() {
        let mut buf = WriteBuffer::new();
        buf.write_i32(DbType::Date as i32).unwrap();
        for part in [2024, 13, 40] {
            buf.write_i32(part).unwrap();
        }
        Value::Int(7).encode(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let first = Value::decode_checked(&mut read).unwrap();
        assert!(matches!(first, Err(Error::ValueConversion(_))));
        assert_eq!(Value::decode(&mut read).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let mut read = ReadBuffer::from_slice(&[0, 0, 0, 99]);
        let err = Value::decode_checked(&mut read).unwrap_err();
        assert!(err.is_session_fatal());
    }

    #[test]
    fn test_param_encoding() {
        let mut buf = WriteBuffer::new();
        Param::output(DbType::Int).encode(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 0]);

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let p = Param::decode(&mut read).unwrap();
        assert_eq!(p.mode, ParamMode::Out);
        assert_eq!(p.db_type, DbType::Int);
        assert!(p.value.is_null());
    }
}
