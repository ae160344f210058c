//! Field catalog: principal fields, their limits, known attribute labels and
//! the header alias table.
//!
//! Everything here is immutable configuration. [`AliasTable::standard`] builds
//! the table used by the header resolver; callers that need extra spellings
//! extend a copy with [`AliasTable::with_alias`] and pass it by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

// =============================================================================
// Limits
// =============================================================================

pub const MAX_NAME: usize = 200;
pub const MAX_DESCRIPTION: usize = 2000;
pub const HARMONIZED_CODE_LEN: usize = 8;
pub const MAX_INTERNAL_CODE: usize = 60;
pub const MAX_ATTRIBUTE_VALUE: usize = 3000;
/// CNPJ root is 8 digits and CPF 11, the API field accepts up to 14.
pub const MAX_OWNER_TAX_ID: usize = 14;

// =============================================================================
// Principal Fields
// =============================================================================

/// A fixed business field of a product, as opposed to a dynamic attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "codigo")]
    Code,
    #[serde(rename = "denominacao")]
    Name,
    #[serde(rename = "descricao")]
    Description,
    #[serde(rename = "cpfCnpjRaiz")]
    OwnerTaxId,
    #[serde(rename = "situacao")]
    Status,
    #[serde(rename = "modalidade")]
    OperationMode,
    #[serde(rename = "ncm")]
    HarmonizedCode,
    #[serde(rename = "codigosInterno")]
    InternalCodes,
}

/// Principal spreadsheet columns, in the order they are written.
pub const PRINCIPAL_COLUMNS: [Field; 8] = [
    Field::Code,
    Field::Name,
    Field::Description,
    Field::OwnerTaxId,
    Field::Status,
    Field::OperationMode,
    Field::HarmonizedCode,
    Field::InternalCodes,
];

/// Fields that must be filled to create a product.
pub const REQUIRED_FOR_CREATE: [Field; 5] = [
    Field::Description,
    Field::Name,
    Field::HarmonizedCode,
    Field::OwnerTaxId,
    Field::OperationMode,
];

impl Field {
    /// Name of the field in the CATP JSON and in generated spreadsheets.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Field::Code => "codigo",
            Field::Name => "denominacao",
            Field::Description => "descricao",
            Field::OwnerTaxId => "cpfCnpjRaiz",
            Field::Status => "situacao",
            Field::OperationMode => "modalidade",
            Field::HarmonizedCode => "ncm",
            Field::InternalCodes => "codigosInterno",
        }
    }

    /// Parse a wire name or a header spelling of it (`cpf_cnpj_raiz`, `NCM`).
    pub fn from_wire_name(name: &str) -> Option<Self> {
        let key = header_key(name);
        PRINCIPAL_COLUMNS
            .into_iter()
            .find(|f| header_key(f.wire_name()) == key)
    }

    /// Maximum length accepted by the API, when the field has one.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            Field::Name => Some(MAX_NAME),
            Field::Description => Some(MAX_DESCRIPTION),
            Field::OwnerTaxId => Some(MAX_OWNER_TAX_ID),
            Field::HarmonizedCode => Some(HARMONIZED_CODE_LEN),
            _ => None,
        }
    }

    /// Extra hint shown when the column is missing from a spreadsheet.
    pub fn missing_hint(&self) -> Option<&'static str> {
        match self {
            Field::Name => Some("or Titulo, Nome do Produto"),
            Field::OwnerTaxId => Some("8-digit CNPJ root, or provide a default"),
            Field::OperationMode => Some("IMPORTACAO/EXPORTACAO, or provide a default"),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// =============================================================================
// Known Attributes
// =============================================================================

/// Human labels for attribute codes that show up in most medical/dental NCMs.
pub const ATTRIBUTE_LABELS: [(&str, &str); 11] = [
    ("ATT_14540", "Condição do Produto"),
    ("ATT_14545", "País de Origem (Código)"),
    ("ATT_14546", "Validade do Produto"),
    ("ATT_14547", "Produto Controlado"),
    ("ATT_14551", "Registro ANVISA"),
    ("ATT_14554", "Produto Perigoso"),
    ("ATT_14555", "Fabricante/Exportador"),
    ("ATT_14556", "Tipo de Embalagem"),
    ("ATT_14860", "Nome Comercial"),
    ("ATT_15120", "Composição/Material"),
    ("ATT_15121", "Modelo/Referência"),
];

/// Country-of-origin attribute, injected from a default when configured.
pub const ORIGIN_COUNTRY_ATTRIBUTE: &str = "ATT_14545";

pub fn attribute_label(code: &str) -> Option<&'static str> {
    ATTRIBUTE_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

// =============================================================================
// Header Keys
// =============================================================================

/// Comparison key for headers: accents folded, uppercased, with spaces,
/// underscores and hyphens removed.
///
/// `"Descrição do Produto"` and `"DESCRICAO_DO_PRODUTO"` share a key.
pub fn header_key(header: &str) -> String {
    header
        .trim()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_uppercase)
        .collect()
}

// =============================================================================
// Alias Table
// =============================================================================

const STANDARD_ALIASES: &[(&str, Field)] = &[
    ("CODIGO", Field::Code),
    ("COD", Field::Code),
    ("CODE", Field::Code),
    ("DENOMINACAO", Field::Name),
    ("NOME", Field::Name),
    ("NOME_PRODUTO", Field::Name),
    ("NOME DO PRODUTO", Field::Name),
    ("TITULO", Field::Name),
    ("PRODUTO", Field::Name),
    ("NOME COMERCIAL", Field::Name),
    ("NAME", Field::Name),
    ("DESCRICAO", Field::Description),
    ("DESCRICAO_PRODUTO", Field::Description),
    ("DESCRICAO DO PRODUTO", Field::Description),
    ("DESCRICAO DETALHADA", Field::Description),
    ("DESCRIPTION", Field::Description),
    ("CNPJ", Field::OwnerTaxId),
    ("CNPJ_RAIZ", Field::OwnerTaxId),
    ("CPF_CNPJ", Field::OwnerTaxId),
    ("CPFCNPJRAIZ", Field::OwnerTaxId),
    ("CPF/CNPJ RAIZ", Field::OwnerTaxId),
    ("OWNER TAX ID", Field::OwnerTaxId),
    ("SITUACAO", Field::Status),
    ("STATUS", Field::Status),
    ("ATIVO", Field::Status),
    ("MODALIDADE", Field::OperationMode),
    ("TIPO", Field::OperationMode),
    ("TIPO OPERACAO", Field::OperationMode),
    ("OPERATION MODE", Field::OperationMode),
    ("NCM", Field::HarmonizedCode),
    ("CODIGO_NCM", Field::HarmonizedCode),
    ("COD_NCM", Field::HarmonizedCode),
    ("NCM/SH", Field::HarmonizedCode),
    ("CLASSIFICACAO FISCAL", Field::HarmonizedCode),
    ("HARMONIZED CODE", Field::HarmonizedCode),
    ("CODIGOS INTERNOS", Field::InternalCodes),
    ("CODIGOS_INTERNO", Field::InternalCodes),
    ("CODIGO_INTERNO", Field::InternalCodes),
    ("COD_INTERNO", Field::InternalCodes),
    ("CODIGO DE BARRAS", Field::InternalCodes),
    ("COD BARRAS", Field::InternalCodes),
    ("EAN", Field::InternalCodes),
    ("GTIN", Field::InternalCodes),
    ("COD DE FABRICA", Field::InternalCodes),
    ("CODIGO DE FABRICA", Field::InternalCodes),
    ("REFERENCIA DO FORNECEDOR", Field::InternalCodes),
    ("REF FORNECEDOR", Field::InternalCodes),
    ("INTERNAL CODES", Field::InternalCodes),
];

/// Alternative header spellings mapped to principal fields.
///
/// Lookup is by [`header_key`]; the first matching alias wins.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<(String, Field)>,
}

impl AliasTable {
    /// The built-in aliases for Brazilian catalog spreadsheets.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_ALIASES
                .iter()
                .map(|(alias, field)| (header_key(alias), *field))
                .collect(),
        }
    }

    /// An empty table (only canonical names will match).
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add an alias after the existing ones.
    pub fn with_alias(mut self, alias: &str, field: Field) -> Self {
        self.entries.push((header_key(alias), field));
        self
    }

    pub fn lookup(&self, header: &str) -> Option<Field> {
        let key = header_key(header);
        self.entries
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, field)| *field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Defaults
// =============================================================================

/// Values used for principal fields that have no column in the spreadsheet.
///
/// Blank values are ignored so an empty form field never counts as a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefaults(BTreeMap<Field, String>);

impl FieldDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&field);
        } else {
            self.0.insert(field, value.trim().to_string());
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
