//! Customer tagging for parsed facility documents.
//!
//! Text extraction from the uploaded PDFs happens in the external parsing
//! service. What arrives here is `(file_name, document_content)`; the only
//! local rule is which customer a document belongs to, decided from its
//! file name.

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::models::Customer;

// ---

const CUSTOMER_PREFIX: &str = "cust-";

/// Output of the document parsing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    // ---
    pub file_name: String,
    pub document_content: String,
}

/// A parsed document attributed to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaggedDocument {
    // ---
    pub file_name: String,
    pub document_content: String,
    pub customer_id: String,
    pub customer_name: String,
}

/// Attribute a parsed document to exactly one customer.
pub fn tag_document(
    doc: ParsedDocument,
    customers: &[Customer],
) -> Result<TaggedDocument, DocumentError> {
    // ---
    let customer = match_customer(&doc.file_name, customers)?;
    Ok(TaggedDocument {
        customer_id: customer.customer_id.clone(),
        customer_name: customer.customer_name.clone(),
        file_name: doc.file_name,
        document_content: doc.document_content,
    })
}

/// Find the customer a file name refers to.
///
/// The name matches when, after normalisation, it contains the full customer
/// id (`cust-dc-8472`) or the id without its `CUST-` prefix (`dc-8472`).
pub fn match_customer<'a>(
    file_name: &str,
    customers: &'a [Customer],
) -> Result<&'a Customer, DocumentError> {
    // ---
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(DocumentError::UnsupportedFile(file_name.to_string()));
    }

    let haystack = normalize(file_name);
    let matches: Vec<&Customer> = customers
        .iter()
        .filter(|c| {
            let id = normalize(&c.customer_id);
            let short = id.strip_prefix(CUSTOMER_PREFIX).unwrap_or(&id);
            !short.is_empty() && haystack.contains(short)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(DocumentError::NoMatchingCustomer(file_name.to_string())),
        [one] => Ok(*one),
        many => Err(DocumentError::AmbiguousCustomer {
            file_name: file_name.to_string(),
            candidates: many.iter().map(|c| c.customer_id.clone()).collect(),
        }),
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .map(|ch| match ch {
            '_' | ' ' | '.' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
