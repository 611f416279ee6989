//! Parse-tree tags.
//!
//! The tag space is a dense small-integer enum shared with the external
//! parser; the numeric values are part of the wire contract and must not
//! be reordered. The first statement tag is 101; values 127 and 128 are
//! reserved boundary slots between the statement and expression ranges.

/// Operator or leaf kind of a parse-tree node.
///
/// Discriminants are bit-exact with the parser's token numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Tag {
    // ------------------------------------------------------------------
    // Declarative constructs (101..=126)
    // ------------------------------------------------------------------
    Trans = 101,
    Init,
    Invar,
    Assign,
    Fairness,
    Justice,
    Compassion,
    Spec,
    LtlSpec,
    PslSpec, // 110
    InvarSpec,
    Compute,
    Define,
    Isa,
    Goto,
    Constraint,
    Module,
    Process,
    ModType,
    Lambda, // 120
    Constants,
    Pred,
    AtTime,
    PredsList,
    Mirror,
    SyntaxError, // 126

    // ------------------------------------------------------------------
    // Expression constructs (129..=241); 127/128 are reserved
    // ------------------------------------------------------------------
    Failure = 129,
    Context,
    Eu,
    Au,
    Ebu,
    Abu,
    Minu,
    Maxu,
    Var,
    FrozenVar,
    IVar,
    Boolean, // 140
    Array,
    Scalar,
    Cons,
    Bdd,
    Semi,
    EqDef,
    TwoDots,
    FalseExp,
    TrueExp,
    SelfId, // 150
    Case,
    Colon,
    IfThenElse,
    SimpWff,
    NextWff,
    LtlWff,
    CtlWff,
    CompWff,
    Atom,
    Number, // 160
    Comma,
    Implies,
    Iff,
    Or,
    Xor,
    Xnor,
    And,
    Not,
    Ex,
    Ax, // 170
    Ef,
    Af,
    Eg,
    Ag,
    Since,
    Until,
    Triggered,
    Releases,
    Ebf,
    Ebg, // 180
    Abf,
    Abg,
    OpNext,
    OpGlobal,
    OpFuture,
    OpPrec,
    OpNotPrecNot,
    OpHistorical,
    OpOnce,
    Equal, // 190
    NotEqual,
    Lt,
    Gt,
    Le,
    Ge,
    Union,
    SetIn,
    Mod,
    Plus,
    Minus, // 200
    Times,
    Divide,
    UMinus,
    Next,
    SmallInit,
    Dot,
    Bit,
    Range,
    UnsignedWord,
    SignedWord, // 210
    Integer,
    Real,
    NumberUnsignedWord,
    NumberSignedWord,
    NumberFrac,
    NumberReal,
    NumberExp,
    LShift,
    RShift,
    LRotate, // 220
    RRotate,
    BitSelection,
    Concatenation,
    CastBool,
    CastWord1,
    CastSigned,
    CastUnsigned,
    Extend,
    WordArray,
    WaRead, // 230
    WaWrite,
    UwConst,
    SwConst,
    WResize,
    WSizeof,
    CastToInt,
    CompId,
    ArrayType,
    ArrayDef,
    NFunction, // 240
    Count,
}

impl Tag {
    /// Numeric value shared with the parser.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// True for declarative (statement-level) tags.
    pub fn is_statement(self) -> bool {
        (self as u16) <= Tag::SyntaxError as u16
    }

    /// True for expression-level tags.
    pub fn is_expression(self) -> bool {
        (self as u16) >= Tag::Failure as u16
    }

    /// True for tags whose nodes carry no children, only a payload.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Tag::TrueExp
                | Tag::FalseExp
                | Tag::Number
                | Tag::NumberUnsignedWord
                | Tag::NumberSignedWord
                | Tag::Atom
                | Tag::SelfId
                | Tag::Failure
        )
    }

    /// True for word-constant tags.
    pub fn is_word_constant(self) -> bool {
        matches!(self, Tag::NumberUnsignedWord | Tag::NumberSignedWord)
    }

    /// True for boolean-constant tags.
    pub fn is_bool_constant(self) -> bool {
        matches!(self, Tag::TrueExp | Tag::FalseExp)
    }

    /// True for future-time and past-time temporal operator tags.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Tag::OpNext
                | Tag::OpGlobal
                | Tag::OpFuture
                | Tag::OpPrec
                | Tag::OpNotPrecNot
                | Tag::OpHistorical
                | Tag::OpOnce
                | Tag::Until
                | Tag::Since
                | Tag::Releases
                | Tag::Triggered
        )
    }
}

/// Kind of a deferred constant-evaluation error.
///
/// Failures are ordinary leaves in the expression graph so that dead
/// branches of `CASE`/`ITE` do not abort compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    CaseNotExhaustive,
    DivByZero,
    ArrayOutOfBounds,
    Unspecified,
}

impl FailureKind {
    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            FailureKind::CaseNotExhaustive => "case conditions are not exhaustive",
            FailureKind::DivByZero => "division by zero",
            FailureKind::ArrayOutOfBounds => "array index out of bounds",
            FailureKind::Unspecified => "unspecified failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_match_parser_tokens() {
        assert_eq!(Tag::Trans.as_u16(), 101);
        assert_eq!(Tag::PslSpec.as_u16(), 110);
        assert_eq!(Tag::Lambda.as_u16(), 120);
        assert_eq!(Tag::SyntaxError.as_u16(), 126);
        assert_eq!(Tag::Failure.as_u16(), 129);
        assert_eq!(Tag::Boolean.as_u16(), 140);
        assert_eq!(Tag::Number.as_u16(), 160);
        assert_eq!(Tag::Ebg.as_u16(), 180);
        assert_eq!(Tag::Minus.as_u16(), 200);
        assert_eq!(Tag::LRotate.as_u16(), 220);
        assert_eq!(Tag::WaRead.as_u16(), 230);
        assert_eq!(Tag::NFunction.as_u16(), 240);
        assert_eq!(Tag::Count.as_u16(), 241);
    }

    #[test]
    fn statement_expression_split() {
        assert!(Tag::Trans.is_statement());
        assert!(Tag::SyntaxError.is_statement());
        assert!(!Tag::Failure.is_statement());
        assert!(Tag::Failure.is_expression());
        assert!(Tag::Count.is_expression());
        assert!(!Tag::Mirror.is_expression());
    }
}
