use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(JsObject),
}

// UTF-16 code unit string (§6.1.4)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    /// §11.1.4 CodePointAt, returning the code units of the code point that
    /// starts at `position`. A lone surrogate is returned as a single unit.
    pub fn code_point_at(&self, position: usize) -> Option<JsString> {
        let first = *self.code_units.get(position)?;
        if (0xD800..=0xDBFF).contains(&first)
            && let Some(&second) = self.code_units.get(position + 1)
            && (0xDC00..=0xDFFF).contains(&second)
        {
            return Some(JsString {
                code_units: vec![first, second],
            });
        }
        Some(JsString {
            code_units: vec![first],
        })
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for JsSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "Symbol({desc})"),
            None => write!(f, "Symbol()"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

/// Handle to a heap-allocated object owned by the interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JsObject {
    pub id: u64,
}

/// §6.1.7 property key: a String or a Symbol value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    /// §6.1.7 array index: a canonical numeric string for an integer in [0, 2^32 - 2].
    pub fn as_array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let text = s.to_rust_string();
        let index: u32 = text.parse().ok()?;
        if index == u32::MAX || index.to_string() != text {
            return None;
        }
        Some(index)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        PropertyKey::String(JsString::from_str(&index.to_string()))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{s}"),
        }
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<JsObject> {
        match self {
            JsValue::Object(o) => Some(*o),
            _ => None,
        }
    }

    /// §7.1.2 ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => !(*n == 0.0 || n.is_nan()),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Symbol(_) | JsValue::Object(_) => true,
            JsValue::BigInt(b) => b.value != num_bigint::BigInt::from(0),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Symbol(_) => "symbol",
            JsValue::BigInt(_) => "bigint",
            JsValue::Object(_) => "object",
        }
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        // ryu gives the shortest round-tripping digits Number::toString needs
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let int_val = x.trunc();
        int_val.rem_euclid(4_294_967_296.0) as u32
    }

    // §7.1.20 ToLength
    pub fn to_length(x: f64) -> usize {
        if x.is_nan() || x <= 0.0 {
            return 0;
        }
        x.trunc().min(9_007_199_254_740_991.0) as usize
    }

    /// WhiteSpace or LineTerminator. U+0085 is Unicode White_Space but not
    /// ECMAScript whitespace; U+FEFF is the reverse.
    fn is_js_whitespace(c: char) -> bool {
        c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{0085}')
    }

    // §7.1.4.1.1 StringToNumber
    pub fn string_to_number(s: &str) -> f64 {
        let trimmed = s.trim_matches(is_js_whitespace);
        if trimmed.is_empty() {
            return 0.0;
        }
        let bytes = trimmed.as_bytes();
        if bytes.len() > 2 && bytes[0] == b'0' {
            let radix = match bytes[1] {
                b'x' | b'X' => Some(16),
                b'o' | b'O' => Some(8),
                b'b' | b'B' => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                return parse_radix_digits(&trimmed[2..], radix);
            }
        }
        let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
        if unsigned == "Infinity" {
            return if trimmed.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            };
        }
        if !is_str_decimal_literal(unsigned) {
            return f64::NAN;
        }
        trimmed.parse().unwrap_or(f64::NAN)
    }

    fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
        let mut value = 0.0_f64;
        for c in digits.chars() {
            match c.to_digit(radix) {
                Some(d) => value = value * f64::from(radix) + f64::from(d),
                None => return f64::NAN,
            }
        }
        value
    }

    /// StrUnsignedDecimalLiteral without `Infinity`: digits with an optional
    /// fraction (at least one digit overall) and an optional exponent.
    fn is_str_decimal_literal(s: &str) -> bool {
        let bytes = s.as_bytes();
        let mut i = 0;
        let digits_from = |i: &mut usize| {
            let start = *i;
            while *i < bytes.len() && bytes[*i].is_ascii_digit() {
                *i += 1;
            }
            *i - start
        };
        let mut mantissa = digits_from(&mut i);
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            mantissa += digits_from(&mut i);
        }
        if mantissa == 0 {
            return false;
        }
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            i += 1;
            if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                i += 1;
            }
            if digits_from(&mut i) == 0 {
                return false;
            }
        }
        i == bytes.len()
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => write!(f, "{s}"),
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}
