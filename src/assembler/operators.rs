//! Operator name tables of the virtual machine.
//!
//! The position of a name in its table is the opcode minor of the
//! corresponding `unary`, `binary` or `ternary` instruction.

pub const UNARY_OPS: &[&str] = &[
    "NOT", "BOOL", "NEG", "POS", "SIN", "COS", "TAN", "ZAP", "ABS", "EXP", "LOG", "BITNOT",
    "ISEMPTY", "ISNUM", "ISSTRING", "ASC", "CHR", "STR", "SQRT", "TRUNC", "ROUND", "LTRIM",
    "RTRIM", "LRTRIM", "LENGTH", "VAL", "TRACE", "NOT2", "ATAN", "INC", "DEC", "ISPROCEDURE",
    "FILENR", "FREEFILENR", "KEYCREATE", "KEYLOOKUP", "ISARRAY", "UCASE", "LCASE", "SIGN",
];

pub const BINARY_OPS: &[&str] = &[
    "AND", "OR", "XOR", "ADD", "SUB", "MULT", "DIVIDE", "INTEGERDIVIDE", "REMAINDER", "POW",
    "CONCAT", "CONCATEMPTY", "COMPAREEQ", "COMPAREEQ_NC", "COMPARENE", "COMPARENE_NC",
    "COMPARELE", "COMPARELE_NC", "COMPARELT", "COMPARELT_NC", "COMPAREGE", "COMPAREGE_NC",
    "COMPAREGT", "COMPAREGT_NC", "MIN", "MIN_NC", "MAX", "MAX_NC", "FIRSTSTR", "FIRSTSTR_NC",
    "RESTSTR", "RESTSTR_NC", "FINDSTR", "FINDSTR_NC", "BITAND", "BITOR", "BITXOR", "STR",
    "ATAN", "LCUT", "RCUT", "ENDCUT", "STRMULT", "KEYADDPARENT", "KEYFIND", "ARRAYDIM",
];

pub const TERNARY_OPS: &[&str] = &["KEYADD"];
