//! Size limits (spec 4.4.7). Every limit is individually fatal when exceeded,
//! and the lexeme limit is checked during capture, not just at token emission,
//! so an unterminated quoted literal cannot grow without bound.

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_label_len: usize,
    pub max_attribute_name_len: usize,
    pub max_attribute_value_len: usize,
    pub max_literal_value_len: usize,
    pub max_inflight_lexeme_len: usize,
    pub max_attributes_per_document: usize,
    pub max_subdocuments_per_document: usize,
    pub max_literals_per_document: usize,
    pub max_nesting_depth: usize,
    pub max_subdocuments_per_parse: usize,
    pub max_literals_per_parse: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_label_len: 127,
            max_attribute_name_len: 127,
            max_attribute_value_len: 256 * KIB,
            max_literal_value_len: 4 * MIB,
            max_inflight_lexeme_len: 4 * MIB,
            max_attributes_per_document: 1024,
            max_subdocuments_per_document: 32 * KIB,
            max_literals_per_document: 32 * KIB,
            max_nesting_depth: 64,
            max_subdocuments_per_parse: 256 * KIB,
            max_literals_per_parse: 256 * KIB,
        }
    }
}

/// Which limit was exceeded, used by [`crate::error::BachError::Limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    LabelLen,
    AttributeNameLen,
    AttributeValueLen,
    LiteralValueLen,
    InflightLexemeLen,
    AttributesPerDocument,
    SubdocumentsPerDocument,
    LiteralsPerDocument,
    NestingDepth,
    SubdocumentsPerParse,
    LiteralsPerParse,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LimitKind::LabelLen => "max label length",
            LimitKind::AttributeNameLen => "max attribute name length",
            LimitKind::AttributeValueLen => "max attribute value length",
            LimitKind::LiteralValueLen => "max literal value length",
            LimitKind::InflightLexemeLen => "max in-flight lexeme length",
            LimitKind::AttributesPerDocument => "max attributes per (sub)document",
            LimitKind::SubdocumentsPerDocument => "max subdocuments per (sub)document",
            LimitKind::LiteralsPerDocument => "max literals per (sub)document",
            LimitKind::NestingDepth => "max subdocument nesting depth",
            LimitKind::SubdocumentsPerParse => "max subdocuments per whole parse",
            LimitKind::LiteralsPerParse => "max literals per whole parse",
        };
        write!(f, "{name}")
    }
}

/// Running counters for the whole-parse limits (subdocuments and literals
/// across the entire parse, as opposed to per-document counts which live on
/// `Document` itself).
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub subdocuments_total: usize,
    pub literals_total: usize,
    pub nesting_depth: usize,
}
