//! Attribute types every server carries
//!
//! User attributes from RFC 4519 / RFC 2307 plus the operational attributes
//! published by the root DSE and the subschema subentry.

use super::AttributeTypeDef;
use ldapd_core::types::{AttributeUsage, MatchingRule, Syntax};

pub(crate) fn builtin_definitions() -> Vec<AttributeTypeDef> {
    use MatchingRule::*;

    vec![
        // Core
        AttributeTypeDef::new("2.5.4.0", &["objectClass"])
            .syntax(Syntax::Oid)
            .equality(ObjectIdentifierMatch),
        AttributeTypeDef::new("2.5.4.1", &["aliasedObjectName", "aliasedEntryName"])
            .syntax(Syntax::Dn)
            .equality(DistinguishedNameMatch)
            .single_value(),
        AttributeTypeDef::new("2.5.4.41", &["name"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseIgnoreMatch),
        AttributeTypeDef::new("2.5.4.49", &["distinguishedName"])
            .syntax(Syntax::Dn)
            .equality(DistinguishedNameMatch),
        // Naming attributes
        AttributeTypeDef::new("2.5.4.3", &["cn", "commonName"]).sup("name"),
        AttributeTypeDef::new("2.5.4.4", &["sn", "surname"]).sup("name"),
        AttributeTypeDef::new("2.5.4.42", &["givenName", "gn"]).sup("name"),
        AttributeTypeDef::new("2.5.4.6", &["c", "countryName"])
            .sup("name")
            .single_value(),
        AttributeTypeDef::new("2.5.4.7", &["l", "localityName"]).sup("name"),
        AttributeTypeDef::new("2.5.4.8", &["st", "stateOrProvinceName"]).sup("name"),
        AttributeTypeDef::new("2.5.4.10", &["o", "organizationName"]).sup("name"),
        AttributeTypeDef::new("2.5.4.11", &["ou", "organizationalUnitName"]).sup("name"),
        AttributeTypeDef::new("2.5.4.12", &["title"]).sup("name"),
        AttributeTypeDef::new("2.5.4.9", &["street", "streetAddress"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseIgnoreMatch),
        AttributeTypeDef::new("2.5.4.13", &["description"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseIgnoreMatch),
        AttributeTypeDef::new("2.5.4.20", &["telephoneNumber"])
            .syntax(Syntax::TelephoneNumber)
            .equality(TelephoneNumberMatch),
        AttributeTypeDef::new("2.5.4.31", &["member"]).sup("distinguishedName"),
        AttributeTypeDef::new("2.5.4.32", &["owner"]).sup("distinguishedName"),
        AttributeTypeDef::new("2.5.4.34", &["seeAlso"]).sup("distinguishedName"),
        AttributeTypeDef::new("2.5.4.35", &["userPassword"])
            .syntax(Syntax::OctetString)
            .equality(OctetStringMatch),
        AttributeTypeDef::new("0.9.2342.19200300.100.1.1", &["uid", "userid"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseIgnoreMatch),
        AttributeTypeDef::new("0.9.2342.19200300.100.1.3", &["mail", "rfc822Mailbox"])
            .syntax(Syntax::Ia5String)
            .equality(CaseIgnoreIa5Match),
        AttributeTypeDef::new("0.9.2342.19200300.100.1.25", &["dc", "domainComponent"])
            .syntax(Syntax::Ia5String)
            .equality(CaseIgnoreIa5Match)
            .single_value(),
        AttributeTypeDef::new("1.3.6.1.1.1.1.0", &["uidNumber"])
            .syntax(Syntax::Integer)
            .equality(IntegerMatch)
            .single_value(),
        AttributeTypeDef::new("1.3.6.1.1.1.1.1", &["gidNumber"])
            .syntax(Syntax::Integer)
            .equality(IntegerMatch)
            .single_value(),
        AttributeTypeDef::new("2.16.840.1.113730.3.1.3", &["employeeNumber"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseIgnoreMatch)
            .single_value(),
        AttributeTypeDef::new("2.16.840.1.113730.3.1.34", &["ref"])
            .syntax(Syntax::Ia5String)
            .equality(CaseExactMatch)
            .usage(AttributeUsage::DsaOperation),
        // Root DSE
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.5", &["namingContexts"])
            .syntax(Syntax::Dn)
            .equality(DistinguishedNameMatch)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.6", &["altServer"])
            .syntax(Syntax::Ia5String)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.7", &["supportedExtension"])
            .syntax(Syntax::Oid)
            .equality(ObjectIdentifierMatch)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.13", &["supportedControl"])
            .syntax(Syntax::Oid)
            .equality(ObjectIdentifierMatch)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.15", &["supportedLDAPVersion"])
            .syntax(Syntax::Integer)
            .equality(IntegerMatch)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.4203.1.3.5", &["supportedFeatures"])
            .syntax(Syntax::Oid)
            .equality(ObjectIdentifierMatch)
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.1.4", &["vendorName"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseExactMatch)
            .single_value()
            .no_user_modification()
            .usage(AttributeUsage::DsaOperation),
        AttributeTypeDef::new("1.3.6.1.1.5", &["vendorVersion"])
            .syntax(Syntax::DirectoryString)
            .equality(CaseExactMatch)
            .single_value()
            .no_user_modification()
            .usage(AttributeUsage::DsaOperation),
        // Subschema
        AttributeTypeDef::new("2.5.18.10", &["subschemaSubentry"])
            .syntax(Syntax::Dn)
            .equality(DistinguishedNameMatch)
            .single_value()
            .no_user_modification()
            .usage(AttributeUsage::DirectoryOperation),
        AttributeTypeDef::new("2.5.21.4", &["matchingRules"])
            .syntax(Syntax::DirectoryString)
            .equality(ObjectIdentifierFirstComponentMatch)
            .usage(AttributeUsage::DirectoryOperation),
        AttributeTypeDef::new("2.5.21.5", &["attributeTypes"])
            .syntax(Syntax::DirectoryString)
            .equality(ObjectIdentifierFirstComponentMatch)
            .usage(AttributeUsage::DirectoryOperation),
        AttributeTypeDef::new("2.5.21.6", &["objectClasses"])
            .syntax(Syntax::DirectoryString)
            .equality(ObjectIdentifierFirstComponentMatch)
            .usage(AttributeUsage::DirectoryOperation),
        AttributeTypeDef::new("1.3.6.1.4.1.1466.101.120.16", &["ldapSyntaxes"])
            .syntax(Syntax::DirectoryString)
            .equality(ObjectIdentifierFirstComponentMatch)
            .usage(AttributeUsage::DirectoryOperation),
    ]
}

/// Object classes the server knows by name: OID, name, rest of the definition
pub(crate) const BUILTIN_OBJECT_CLASSES: &[(&str, &str, &str)] = &[
    ("2.5.6.0", "top", "ABSTRACT MUST objectClass"),
    ("2.5.6.1", "alias", "SUP top STRUCTURAL MUST aliasedObjectName"),
    ("2.5.6.2", "country", "SUP top STRUCTURAL MUST c MAY description"),
    (
        "2.5.6.4",
        "organization",
        "SUP top STRUCTURAL MUST o MAY ( description $ l $ st $ street $ telephoneNumber )",
    ),
    (
        "2.5.6.5",
        "organizationalUnit",
        "SUP top STRUCTURAL MUST ou MAY ( description $ l $ st $ street $ telephoneNumber )",
    ),
    (
        "2.5.6.6",
        "person",
        "SUP top STRUCTURAL MUST ( sn $ cn ) MAY ( userPassword $ telephoneNumber $ seeAlso $ description )",
    ),
    (
        "2.5.6.7",
        "organizationalPerson",
        "SUP person STRUCTURAL MAY ( title $ ou $ street $ l $ st )",
    ),
    ("2.5.6.9", "groupOfNames", "SUP top STRUCTURAL MUST ( member $ cn ) MAY ( owner $ description )"),
    (
        "2.16.840.1.113730.3.2.2",
        "inetOrgPerson",
        "SUP organizationalPerson STRUCTURAL MAY ( givenName $ mail $ uid $ employeeNumber )",
    ),
    ("0.9.2342.19200300.100.4.13", "domain", "SUP top STRUCTURAL MUST dc MAY ( description $ l )"),
    ("1.3.6.1.4.1.1466.344", "dcObject", "SUP top AUXILIARY MUST dc"),
    ("1.3.6.1.1.1.2.0", "posixAccount", "SUP top AUXILIARY MUST ( cn $ uid $ uidNumber $ gidNumber )"),
    ("2.16.840.1.113730.3.2.6", "referral", "SUP top STRUCTURAL MUST ref"),
    ("1.3.6.1.4.1.1466.101.120.111", "extensibleObject", "SUP top AUXILIARY"),
    ("2.5.17.0", "subentry", "SUP top STRUCTURAL MUST ( cn $ subtreeSpecification )"),
    (
        "2.5.20.1",
        "subschema",
        "AUXILIARY MAY ( attributeTypes $ objectClasses $ matchingRules $ ldapSyntaxes )",
    ),
];
