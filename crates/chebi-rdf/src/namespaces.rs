//! Namespaces and IRI minting.
//!
//! Every IRI the builder emits comes out of this module, already
//! percent-encoded, so serialization never sees an invalid IRI.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

pub const BASE_URI: &str = "https://biokb.scai.fraunhofer.de/chebi";
pub const NODE_NS: &str = "https://biokb.scai.fraunhofer.de/chebi/node#";
pub const REL_NS: &str = "https://biokb.scai.fraunhofer.de/chebi/relation#";
pub const NAME_NS: &str = "https://biokb.scai.fraunhofer.de/chebi/name#";
pub const INCHI_NS: &str = "http://rdf.ncbi.nlm.nih.gov/pubchem/inchikey/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub use chebi_core::{CHEBI_NS, SENTINEL_LABEL};

/// Prefixes bound in every document.
pub const PREFIXES: [(&str, &str); 6] = [
  ("c", CHEBI_NS),
  ("n", NODE_NS),
  ("r", REL_NS),
  ("xs", XSD_NS),
  ("i", INCHI_NS),
  ("cn", NAME_NS),
];

/// Prefix bound to the external namespace of a cross-reference document.
pub const XREF_PREFIX: &str = "e";

/// External namespaces for cross-reference sources, keyed by source prefix.
pub const XREF_NAMESPACES: [(&str, &str); 24] = [
  ("biomodels.db", "https://www.ebi.ac.uk/biomodels/"),
  ("carotenoids_database", "http://carotenoiddb.jp/Entries/"),
  ("chembl", "https://www.ebi.ac.uk/chembl/id_lookup/"),
  ("comptox", "https://comptox.epa.gov/dashboard/chemical/details/"),
  ("eccode", "https://www.brenda-enzymes.org/enzyme.php?ecno="),
  ("go", "https://amigo.geneontology.org/amigo/term/"),
  ("gxa.expt", "https://www.ebi.ac.uk/gxa/experiments/"),
  ("intact", "https://www.ebi.ac.uk/intact/details/interaction/"),
  ("metabolights", "https://www.ebi.ac.uk/metabolights/editor/"),
  (
    "nmrshiftdb2",
    "https://nmrshiftdb.nmr.uni-koeln.de/portal/js_pane/P-Results/nmrshiftdbaction/showDetailsFromHome/molNumber/",
  ),
  ("patent", "https://worldwide.espacenet.com/patent/search?q="),
  ("pdb", "https://identifiers.org/pdb:"),
  ("pubchem.compound", "https://pubchem.ncbi.nlm.nih.gov/compound/"),
  ("pubchem.substance", "https://pubchem.ncbi.nlm.nih.gov/substance/"),
  ("reactome", "https://reactome.org/content/detail/"),
  ("rhea", "https://www.rhea-db.org/rhea/"),
  ("sabiork.reaction", "https://sabiork.h-its.org/reacdetails.jsp?reactid="),
  ("slm", "https://www.swisslipids.org/#/entity/"),
  ("spp", "http://www.signalingpathways.org/datasets/dataset.jsf?doi="),
  ("surechembl", "https://www.surechembl.org/chemical/"),
  ("uniprot", "http://www.uniprot.org/entry/"),
  ("virtual_metabolic_human", "https://www.vmh.life/#metabolite/"),
  ("brenda.ligand", "https://www.brenda-enzymes.de/ligand.php?brenda_ligand_id="),
  ("bindingdb", "http://www.bindingdb.org/rwd/entry/"),
];

/// Everything outside RFC 3987 `ipchar` plus `/` is encoded, so brackets,
/// `#`, `%` and whitespace in an accession never reach the serializer.
const IRI_UNSAFE: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'.')
  .remove(b'_')
  .remove(b'~')
  .remove(b'!')
  .remove(b'$')
  .remove(b'&')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')')
  .remove(b'*')
  .remove(b'+')
  .remove(b',')
  .remove(b';')
  .remove(b'=')
  .remove(b':')
  .remove(b'@')
  .remove(b'/');

/// InChI keys and strings keep only unreserved characters.
const INCHI_UNSAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

// ─── IRIs ────────────────────────────────────────────────────────────────────

pub fn compound(id: i64) -> String { format!("{CHEBI_NS}{id}") }

pub fn node(local: &str) -> String { format!("{NODE_NS}{local}") }

pub fn rel(local: &str) -> String { format!("{REL_NS}{local}") }

pub fn name(id: i64) -> String { format!("{NAME_NS}{id}") }

pub fn inchi(key: &str) -> String { format!("{INCHI_NS}{}", utf8_percent_encode(key, INCHI_UNSAFE)) }

pub fn xref(namespace: &str, accession: &str) -> String {
  format!("{namespace}{}", utf8_percent_encode(accession.trim(), IRI_UNSAFE))
}

/// The external namespace for a source prefix, matched case-insensitively.
pub fn xref_namespace(prefix: &str) -> Option<&'static str> {
  XREF_NAMESPACES
    .iter()
    .find(|(p, _)| p.eq_ignore_ascii_case(prefix.trim()))
    .map(|(_, ns)| *ns)
}

// ─── Local names ─────────────────────────────────────────────────────────────

/// `chembl` → `chembl_xref.ttl`, `gxa.expt` → `gxa_expt_xref.ttl`.
pub fn xref_document(prefix: &str) -> String {
  format!("{}_xref.ttl", prefix.trim().to_lowercase().replace('.', "_"))
}

/// `brenda.ligand` → `XrefBrendaligand`.
pub fn xref_class(prefix: &str) -> String {
  let word: String = prefix.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
  format!("Xref{}", capitalize(&word))
}

/// `IUPAC NAME` → `NameIupacName`.
pub fn name_class(kind: &str) -> String {
  let camel: String = kind.split_whitespace().map(capitalize).collect();
  format!("Name{camel}")
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_and_class_names() {
    assert_eq!(xref_document("chembl"), "chembl_xref.ttl");
    assert_eq!(xref_document("Gxa.Expt"), "gxa_expt_xref.ttl");
    assert_eq!(xref_class("brenda.ligand"), "XrefBrendaligand");
    assert_eq!(xref_class("virtual_metabolic_human"), "XrefVirtual_metabolic_human");
    assert_eq!(name_class("IUPAC NAME"), "NameIupacName");
    assert_eq!(name_class("SYNONYM"), "NameSynonym");
  }

  #[test]
  fn minted_iris_are_encoded() {
    assert_eq!(compound(15377), "http://purl.obolibrary.org/obo/CHEBI_15377");
    assert_eq!(
      inchi("InChI=1S/H2O/h1H2"),
      "http://rdf.ncbi.nlm.nih.gov/pubchem/inchikey/InChI%3D1S%2FH2O%2Fh1H2"
    );
    assert_eq!(
      inchi("XLYOFNOQVPJJNP-UHFFFAOYSA-N"),
      "http://rdf.ncbi.nlm.nih.gov/pubchem/inchikey/XLYOFNOQVPJJNP-UHFFFAOYSA-N"
    );
    let slm = xref_namespace("SLM").unwrap();
    assert_eq!(xref(slm, "SLM:000#1 x"), "https://www.swisslipids.org/#/entity/SLM:000%231%20x");
  }

  #[test]
  fn xref_accessions_with_delimiters_are_escaped() {
    let chembl = xref_namespace("chembl").unwrap();
    assert_eq!(
      xref(chembl, "CHEMBL[1] x"),
      "https://www.ebi.ac.uk/chembl/id_lookup/CHEMBL%5B1%5D%20x"
    );
    assert_eq!(xref(chembl, "a?b%c"), "https://www.ebi.ac.uk/chembl/id_lookup/a%3Fb%25c");
    let pdb = xref_namespace("pdb").unwrap();
    assert_eq!(xref(pdb, " 1abc/A:B(2)+ "), "https://identifiers.org/pdb:1abc/A:B(2)+");
    for accession in ["CHEMBL[1]", "{x}|y", "a\\b^c`d", "é<1>"] {
      let iri = xref(chembl, accession);
      assert!(oxrdf::NamedNode::new(&iri).is_ok(), "{iri}");
    }
  }

  #[test]
  fn unknown_prefixes_have_no_namespace() {
    assert!(xref_namespace("kegg.compound").is_none());
    assert_eq!(xref_namespace("go"), Some("https://amigo.geneontology.org/amigo/term/"));
  }
}
