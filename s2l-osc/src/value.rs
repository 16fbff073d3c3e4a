/// A single typed OSC argument. Variant order matches the type-tag table in
/// the wire format: `c,i,h,f,d,s,b,t,r,m,T,F,N,I`.
#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Char(i32),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Blob(Vec<u8>),
    Time(u64),
    Rgba(i32),
    Midi(i32),
    True,
    False,
    Nil,
    Inf,
}

impl OscValue {
    /// The type-tag character this value is encoded under.
    pub fn tag(&self) -> char {
        match self {
            OscValue::Char(_) => 'c',
            OscValue::Int(_) => 'i',
            OscValue::Long(_) => 'h',
            OscValue::Float(_) => 'f',
            OscValue::Double(_) => 'd',
            OscValue::Str(_) => 's',
            OscValue::Blob(_) => 'b',
            OscValue::Time(_) => 't',
            OscValue::Rgba(_) => 'r',
            OscValue::Midi(_) => 'm',
            OscValue::True => 'T',
            OscValue::False => 'F',
            OscValue::Nil => 'N',
            OscValue::Inf => 'I',
        }
    }

    /// Reduce this value to an `f64` the way the OSC message helper does,
    /// used by `value()`-style numeric accessors. Non-numeric values yield 0.
    pub fn as_f64(&self) -> f64 {
        match self {
            OscValue::Char(v) | OscValue::Int(v) | OscValue::Rgba(v) | OscValue::Midi(v) => {
                *v as f64
            }
            OscValue::Long(v) => *v as f64,
            OscValue::Float(v) => *v as f64,
            OscValue::Double(v) => *v,
            OscValue::True => 1.0,
            OscValue::False => 0.0,
            _ => 0.0,
        }
    }

    /// The dispatcher's truthiness classification for a single argument.
    pub fn truthy(&self) -> s2l_types::Truthy {
        match self {
            OscValue::True => s2l_types::Truthy::Bool(true),
            OscValue::False => s2l_types::Truthy::Bool(false),
            OscValue::Int(v) | OscValue::Char(v) | OscValue::Rgba(v) | OscValue::Midi(v) => {
                s2l_types::Truthy::Int(*v as i64)
            }
            OscValue::Long(v) => s2l_types::Truthy::Int(*v),
            OscValue::Float(v) => s2l_types::Truthy::Double(*v as f64),
            OscValue::Double(v) => s2l_types::Truthy::Double(*v),
            _ => s2l_types::Truthy::Other,
        }
    }
}

/// A decoded OSC message: a path and its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub path: String,
    pub args: Vec<OscValue>,
}

impl OscMessage {
    pub fn new(path: impl Into<String>, args: Vec<OscValue>) -> Self {
        OscMessage { path: path.into(), args }
    }

    /// Truthiness of this message's argument list per the incoming
    /// dispatcher's rule: no args => true, else the first argument's verdict.
    pub fn truthy(&self) -> s2l_types::Truthy {
        match self.args.first() {
            None => s2l_types::Truthy::NoArgs,
            Some(v) => v.truthy(),
        }
    }

    /// First argument as a number, or 0.0 if there is none / it's non-numeric.
    pub fn value(&self) -> f64 {
        self.args.first().map(|v| v.as_f64()).unwrap_or(0.0)
    }
}

/// A decoded OSC packet: either a single message or a timestamped bundle of
/// further packets (which may themselves be bundles).
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    Message(OscMessage),
    Bundle(OscBundle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscBundle {
    pub timetag: u64,
    pub elements: Vec<OscPacket>,
}
