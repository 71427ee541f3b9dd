//! Data point building and writing

use snafu::{Snafu, ensure};
use std::{cmp, collections::BTreeMap, fmt, io, marker::PhantomData, sync::Arc};

/// Errors that occur while building `DataPoint`s
#[derive(Debug, Snafu)]
pub enum DataPointError {
    /// Returned when calling `build` on a `DataPointBuilder` that has no
    /// fields.
    #[snafu(display(
        "All `DataPoints` must have at least one field. Builder contains: {:?}",
        data_point_builder
    ))]
    AtLeastOneFieldRequired {
        /// The current state of the `DataPointBuilder`
        data_point_builder: DataPointBuilder,
    },
}

/// Incrementally constructs a `DataPoint`.
///
/// Create this via `DataPoint::builder`.
#[derive(Debug)]
pub struct DataPointBuilder {
    measurement: EscapedMeasurement,
    // Keeping the tags sorted improves performance on the server side
    tags: BTreeMap<EscapedTagKey, EscapedTagValue>,
    fields: BTreeMap<EscapedFieldKey, FieldValue>,
    timestamp: Option<i64>,
}

impl DataPointBuilder {
    fn new(measurement: impl Into<EscapedMeasurement>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Default::default(),
            fields: Default::default(),
            timestamp: Default::default(),
        }
    }

    /// Sets a tag, replacing any existing tag of the same name.
    pub fn tag(
        mut self,
        name: impl Into<EscapedTagKey>,
        value: impl Into<EscapedTagValue>,
    ) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Sets a field, replacing any existing field of the same name.
    pub fn field(mut self, name: impl Into<EscapedFieldKey>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets the timestamp, replacing any existing timestamp.
    ///
    /// The value is treated as the number of nanoseconds since the
    /// UNIX epoch.
    pub fn timestamp(mut self, value: i64) -> Self {
        self.timestamp = Some(value);
        self
    }

    /// Constructs the data point
    pub fn build(self) -> Result<DataPoint, DataPointError> {
        ensure!(
            !self.fields.is_empty(),
            AtLeastOneFieldRequiredSnafu {
                data_point_builder: self
            }
        );

        let Self {
            measurement,
            tags,
            fields,
            timestamp,
        } = self;

        Ok(DataPoint {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }
}

/// A single point of information to send to InfluxDB.
#[derive(Debug)]
pub struct DataPoint {
    measurement: EscapedMeasurement,
    tags: BTreeMap<EscapedTagKey, EscapedTagValue>,
    fields: BTreeMap<EscapedFieldKey, FieldValue>,
    timestamp: Option<i64>,
}

impl DataPoint {
    /// Create a builder to incrementally construct a `DataPoint`.
    pub fn builder(measurement: impl Into<EscapedMeasurement>) -> DataPointBuilder {
        DataPointBuilder::new(measurement)
    }

    /// The unescaped measurement name
    pub fn measurement(&self) -> &str {
        self.measurement.as_str()
    }

    /// The field value stored under `name`, if any
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(&EscapedFieldKey::from(name))
    }

    /// The timestamp in nanoseconds since the UNIX epoch, if set
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Serializes a point as a single line of line protocol, including the
/// trailing newline.
pub trait WriteDataPoint {
    /// Write this data point as line protocol.
    fn write_data_point_to<W>(&self, w: W) -> io::Result<()>
    where
        W: io::Write;
}

impl WriteDataPoint for DataPoint {
    fn write_data_point_to<W>(&self, mut w: W) -> io::Result<()>
    where
        W: io::Write,
    {
        write!(w, "{}", self.measurement)?;

        for (k, v) in &self.tags {
            write!(w, ",{k}={v}")?;
        }

        for (i, (k, v)) in self.fields.iter().enumerate() {
            let d = if i == 0 { " " } else { "," };
            write!(w, "{d}{k}={v}")?;
        }

        if let Some(ts) = self.timestamp {
            write!(w, " {ts}")?;
        }

        writeln!(w)
    }
}

impl<T> WriteDataPoint for &T
where
    T: WriteDataPoint + ?Sized,
{
    fn write_data_point_to<W>(&self, w: W) -> io::Result<()>
    where
        W: io::Write,
    {
        (**self).write_data_point_to(w)
    }
}

/// A string that will be escaped according to the rules of measurements
pub type EscapedMeasurement = Escaped<Measurement>;
/// A string that will be escaped according to the rules of tag keys
pub type EscapedTagKey = Escaped<TagKey>;
/// A string that will be escaped according to the rules of tag values
pub type EscapedTagValue = Escaped<TagKey>;
/// A string that will be escaped according to the rules of field keys
pub type EscapedFieldKey = Escaped<TagKey>;
/// A string that will be escaped according to the rules of field value strings
pub type EscapedFieldValueString = Escaped<FieldValueString>;

/// Ensures that a string value is appropriately escaped when it is sent to InfluxDB.
///
/// The raw value is reference counted, so large string values can be shared by
/// many points without copying.
#[derive(Debug)]
pub struct Escaped<K>(Arc<str>, PhantomData<K>);

impl<K> Escaped<K> {
    /// The raw, unescaped value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<K> Clone for Escaped<K> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0), PhantomData)
    }
}

impl<K> PartialEq for Escaped<K> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<K> Eq for Escaped<K> {}

impl<K> PartialOrd for Escaped<K> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Escaped<K> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<K> From<&str> for Escaped<K>
where
    K: EscapingSpecification,
{
    fn from(other: &str) -> Self {
        Self(other.into(), PhantomData)
    }
}

impl<K> From<String> for Escaped<K>
where
    K: EscapingSpecification,
{
    fn from(other: String) -> Self {
        Self(other.into(), PhantomData)
    }
}

impl<K> From<Arc<str>> for Escaped<K>
where
    K: EscapingSpecification,
{
    fn from(other: Arc<str>) -> Self {
        Self(other, PhantomData)
    }
}

impl<K> fmt::Display for Escaped<K>
where
    K: EscapingSpecification,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last = 0;

        for (idx, delim) in self.0.match_indices(K::DELIMITERS) {
            let s = &self.0[last..idx];
            write!(f, r#"{s}\{delim}"#)?;
            last = idx + delim.len();
        }

        f.write_str(&self.0[last..])
    }
}

/// Specifies how to escape a particular piece of InfluxDB information.
pub trait EscapingSpecification {
    /// The delimiters that need to be escaped
    const DELIMITERS: &'static [char];
}

/// Rules to escape a measurement name
#[derive(Debug, Copy, Clone)]
pub struct Measurement(());

/// Rules to escape a tag key, tag value, or field key string
#[derive(Debug, Copy, Clone)]
pub struct TagKey(());

/// Rules to escape a field value string
#[derive(Debug, Copy, Clone)]
pub struct FieldValueString(());

impl EscapingSpecification for Measurement {
    const DELIMITERS: &'static [char] = &[',', ' '];
}

impl EscapingSpecification for TagKey {
    const DELIMITERS: &'static [char] = &[',', '=', ' '];
}

impl EscapingSpecification for FieldValueString {
    const DELIMITERS: &'static [char] = &['"', '\\'];
}

/// Possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A true or false value
    Bool(bool),
    /// A 64-bit floating point number
    F64(f64),
    /// A 64-bit signed integer number
    I64(i64),
    /// A string value
    String(EscapedFieldValueString),
}

impl From<bool> for FieldValue {
    fn from(other: bool) -> Self {
        Self::Bool(other)
    }
}

impl From<f64> for FieldValue {
    fn from(other: f64) -> Self {
        Self::F64(other)
    }
}

impl From<i64> for FieldValue {
    fn from(other: i64) -> Self {
        Self::I64(other)
    }
}

impl From<&str> for FieldValue {
    fn from(other: &str) -> Self {
        Self::String(other.into())
    }
}

impl From<String> for FieldValue {
    fn from(other: String) -> Self {
        Self::String(other.into())
    }
}

impl From<Arc<str>> for FieldValue {
    fn from(other: Arc<str>) -> Self {
        Self::String(other.into())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", if *v { "t" } else { "f" }),
            Self::F64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}i"),
            Self::String(v) => write!(f, r#""{v}""#),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str;

    fn assert_utf8_strings_eq(left: &[u8], right: &[u8]) {
        assert_eq!(
            left,
            right,
            "\n\nleft string value:  `{}`,\nright string value: `{}`",
            str::from_utf8(left).unwrap(),
            str::from_utf8(right).unwrap()
        );
    }

    #[test]
    fn point_builder_allows_setting_tags_and_fields() {
        let point = DataPoint::builder("swap")
            .tag("host", "server01")
            .tag("name", "disk0")
            .field("in", 3_i64)
            .field("out", 4_i64)
            .timestamp(1)
            .build()
            .unwrap();

        let mut line = vec![];
        point.write_data_point_to(&mut line).unwrap();

        assert_utf8_strings_eq(&line, b"swap,host=server01,name=disk0 in=3i,out=4i 1\n");
        assert_eq!(point.measurement(), "swap");
        assert_eq!(point.field("in"), Some(&FieldValue::I64(3)));
        assert_eq!(point.timestamp(), Some(1));
    }

    #[test]
    fn no_tags_or_timestamp() {
        let point = DataPoint::builder("m0")
            .field("f0", 1.0)
            .field("f1", 2_i64)
            .build()
            .unwrap();

        let mut line = vec![];
        point.write_data_point_to(&mut line).unwrap();

        assert_utf8_strings_eq(&line, b"m0 f0=1,f1=2i\n");
    }

    #[test]
    fn no_fields() {
        let point_result = DataPoint::builder("m0").build();

        assert!(matches!(
            point_result,
            Err(DataPointError::AtLeastOneFieldRequired { .. })
        ));
    }

    const ALL_THE_DELIMITERS: &str = r#"alpha,beta=delta gamma"epsilon"#;

    #[test]
    fn special_characters_are_escaped_in_measurements() {
        let e = EscapedMeasurement::from(ALL_THE_DELIMITERS);
        assert_eq!(e.to_string(), r#"alpha\,beta=delta\ gamma"epsilon"#);
    }

    #[test]
    fn special_characters_are_escaped_in_tag_keys() {
        let e = EscapedTagKey::from(ALL_THE_DELIMITERS);
        assert_eq!(e.to_string(), r#"alpha\,beta\=delta\ gamma"epsilon"#);
    }

    #[test]
    fn special_characters_are_escaped_in_field_values_of_strings() {
        let e = EscapedFieldValueString::from(ALL_THE_DELIMITERS);
        assert_eq!(e.to_string(), r#"alpha,beta=delta gamma\"epsilon"#);

        let e = EscapedFieldValueString::from(r"C:\temp");
        assert_eq!(e.to_string(), r"C:\\temp");
    }

    #[test]
    fn shared_string_values_are_not_copied() {
        let blob: Arc<str> = Arc::from("x".repeat(1024));
        let value = FieldValue::from(Arc::clone(&blob));

        match &value {
            FieldValue::String(s) => assert!(std::ptr::eq(s.as_str(), &*blob)),
            other => panic!("unexpected field value: {other:?}"),
        }
    }

    #[test]
    fn field_value_of_bool() {
        let e = FieldValue::from(true);
        assert_eq!(e.to_string(), "t");

        let e = FieldValue::from(false);
        assert_eq!(e.to_string(), "f");
    }

    #[test]
    fn field_value_of_float() {
        let e = FieldValue::from(42_f64);
        assert_eq!(e.to_string(), "42");
    }

    #[test]
    fn field_value_of_integer() {
        let e = FieldValue::from(42_i64);
        assert_eq!(e.to_string(), "42i");
    }

    #[test]
    fn field_value_of_string() {
        let e = FieldValue::from("hello");
        assert_eq!(e.to_string(), r#""hello""#);
    }
}
