use std::collections::BTreeMap;

use ocds_profile_builder::{
    BuildError, ContentSource, MemorySource, MirrorSource, ProfileBuilder, ProfileConfig,
    write_profile,
};
use ocds_profile_core::{ResolveError, Severity};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const REGISTRY_BASE_URL: &str = "https://registry.example/";

const AWARD_CRITERIA: &str = "\
Code,Title,Description,Deprecated
priceOnly,Price Only,The award will be made to the qualified bid with the lowest price.,
costOnly,Cost Only,The award will be made to the qualified bid with the lowest cost.,
qualityOnly,Quality Only,The award will be made to the qualified bid with the highest quality-related scores.,
lowestCost,Lowest Cost,Deprecated in favour of priceOnly.,1.1
bestProposal,Best Proposal,Deprecated.,1.1
bestValueToGovernment,Best Value to Government,Deprecated.,1.1
singleBidOnly,Single bid only,Deprecated.,1.1
ratedCriteria,Rated Criteria,\"The award will be made to the qualified bid with the best score, across criteria.\",
";

const CHARGE_PAID_BY: &str = "Code,Title,Description\ngovernment,Government,\nuser,User,\n";

fn ext_url(id: &str, version: &str, file: &str) -> String {
    format!("https://raw.example/{id}/{version}/{file}")
}

/// Files served by the registry and the extensions, keyed by URL.
fn remote_files() -> Vec<(String, String)> {
    let mut files = Vec::new();

    let mut registry = String::from("Id,Date,Version,Base URL,Download URL\n");
    for (id, date, version) in [
        ("ppp", "2018-02-01", "v1.1.3"),
        ("enquiries", "2018-02-01", "v1.1.3"),
        ("charges", "", "master"),
        ("tariffs", "", "master"),
        ("location", "2018-02-01", "v1.1.3"),
        ("bids", "2018-02-01", "v1.1.3"),
        ("retired", "2018-02-01", "v1.1.3"),
        ("conflicting", "", "master"),
        ("inconsistent", "", "master"),
    ] {
        registry.push_str(&format!(
            "{id},{date},{version},{},https://archive.example/{id}/{version}.zip\n",
            ext_url(id, version, "")
        ));
    }
    files.push((format!("{REGISTRY_BASE_URL}extension_versions.csv"), registry));

    let mut extension = |id: &str, version: &str, metadata: Value, schema: Option<Value>, codelists: &[(&str, &str)]| {
        files.push((ext_url(id, version, "extension.json"), metadata.to_string()));
        if let Some(schema) = schema {
            files.push((ext_url(id, version, "release-schema.json"), schema.to_string()));
        }
        for (name, content) in codelists {
            files.push((ext_url(id, version, &format!("codelists/{name}")), content.to_string()));
        }
    };

    extension(
        "ppp",
        "v1.1.3",
        json!({
            "name": {"en": "OCDS for PPPs Extension"},
            "codelists": ["+partyRole.csv", "-partyRole.csv", "initiationType.csv", "documentType.csv", "metricID.csv"],
        }),
        Some(json!({
            "properties": {"buyer": null, "preferredBidders": {"type": "array"}},
        })),
        &[
            ("+partyRole.csv", "Code,Title,Description\npublicAuthority,Public authority,\n"),
            ("-partyRole.csv", "Code,Title,Description\nbuyer,Buyer,\n"),
            (
                "initiationType.csv",
                "Code,Title,Description\nppp,Public Private Partnership,An open competitive bidding or tendering process.\n",
            ),
            (
                "documentType.csv",
                "Code,Title,Description\ntenderNotice,Tender notice,\nawardNotice,Award notice,\ntariffNotice,Tariff notice,\n",
            ),
            ("metricID.csv", "Code,Title,Description\nm1,Metric 1,\n"),
        ],
    );
    extension(
        "enquiries",
        "v1.1.3",
        json!({"name": {"en": "Enquiries", "es": "Consultas"}, "codelists": ["+partyRole.csv"]}),
        Some(json!({"definitions": {"Enquiry": {"type": "object"}}})),
        &[("+partyRole.csv", "Code,Title,Description\nenquirer,Enquirer,\n")],
    );
    extension(
        "charges",
        "master",
        json!({"name": {"en": "Charges"}, "codelists": ["chargePaidBy.csv"]}),
        Some(json!({"definitions": {"Charge": {"properties": {"id": {"type": "string"}}}}})),
        &[("chargePaidBy.csv", CHARGE_PAID_BY)],
    );
    extension(
        "tariffs",
        "master",
        json!({"name": {"en": "Tariffs"}, "codelists": ["chargePaidBy.csv", "+documentType.csv"]}),
        None,
        &[
            ("chargePaidBy.csv", CHARGE_PAID_BY),
            ("+documentType.csv", "Code,Title,Description\ntariffNotice,Tariff notice,\n"),
        ],
    );
    extension(
        "location",
        "v1.1.3",
        json!({"name": "Location", "codelists": ["geometryType.csv"]}),
        Some(json!({
            "definitions": {"Location": {"type": "object"}, "Charge": {"properties": {"id": null}}},
        })),
        &[("geometryType.csv", "Code,Title,Description,Deprecated\nPoint,Point,,\nBox,Box,,1.1\n")],
    );
    extension(
        "bids",
        "v1.1.3",
        json!({"name": {"en": "Bid statistics"}, "codelists": ["+partyRole.csv"]}),
        Some(json!({})),
        &[("+partyRole.csv", "Code,Title,Description\nbidder,Bidder,\n")],
    );
    extension(
        "retired",
        "v1.1.3",
        json!({"name": {"en": "Retired roles"}, "codelists": ["-partyRole.csv"]}),
        None,
        &[("-partyRole.csv", "Code,Title,Description\npayer,Payer,\n")],
    );
    extension(
        "conflicting",
        "master",
        json!({"name": {"en": "Conflicting"}, "codelists": ["chargePaidBy.csv"]}),
        None,
        &[("chargePaidBy.csv", "Code,Title,Description\nnobody,Nobody,\n")],
    );
    extension(
        "inconsistent",
        "master",
        json!({"name": {"en": "Inconsistent"}, "codelists": ["+documentType.csv"]}),
        None,
        &[("+documentType.csv", "Code,Title,Description\nunknownNotice,Unknown,\n")],
    );

    files
}

fn source() -> MemorySource {
    let mut source = MemorySource::new();
    for (url, content) in remote_files() {
        source.insert(url, content);
    }
    source
}

fn standard() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "release-schema.json".to_string(),
            json!({
                "$schema": "http://json-schema.org/draft-04/schema#",
                "properties": {"ocid": {"type": "string"}, "buyer": {"$ref": "#/definitions/Organization"}},
                "definitions": {"Organization": {"type": "object"}},
            })
            .to_string(),
        ),
        ("codelists/awardCriteria.csv".to_string(), AWARD_CRITERIA.to_string()),
        (
            "codelists/partyRole.csv".to_string(),
            "Code,Title,Description\nbuyer,Buyer,\nsupplier,Supplier,\npayer,Payer,\n".to_string(),
        ),
        (
            "codelists/documentType.csv".to_string(),
            "Code,Title,Description\ntenderNotice,Tender notice,\nawardNotice,Award notice,\n".to_string(),
        ),
        (
            "codelists/initiationType.csv".to_string(),
            "Code,Title,Description\ntender,Tender,\n".to_string(),
        ),
        (
            "codelists/milestoneType.csv".to_string(),
            "Code,Title,Description\npreProcurement,Pre-procurement,\n".to_string(),
        ),
        ("README.md".to_string(), "# schema".to_string()),
    ])
}

fn builder(extensions: &[(&str, &str)]) -> ProfileBuilder<MemorySource, BTreeMap<String, String>> {
    let mut config = ProfileConfig::new("1__1__3").with_registry_base_url(REGISTRY_BASE_URL);
    for (id, version) in extensions {
        config = config.with_extension(*id, *version);
    }
    ProfileBuilder::new(config, source(), standard())
}

const STANDARD_CODELISTS: [&str; 5] = [
    "awardCriteria.csv",
    "documentType.csv",
    "initiationType.csv",
    "milestoneType.csv",
    "partyRole.csv",
];

// ---------------------------------------------------------------------------
// Extensions
// ---------------------------------------------------------------------------

#[test]
fn test_extensions() {
    let builder = builder(&[("charges", "master"), ("location", "v1.1.3")]);
    let result = builder.extensions().unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].id, "charges");
    assert_eq!(result[0].date, "");
    assert_eq!(result[0].version, "master");
    assert_eq!(result[0].base_url, "https://raw.example/charges/master/");
    assert_eq!(result[0].download_url, "https://archive.example/charges/master.zip");
    assert_eq!(result[1].id, "location");
    assert_eq!(result[1].date, "2018-02-01");
    assert_eq!(result[1].display_name("en"), "Location");
    assert_eq!(
        result[1].metadata.as_ref().unwrap().codelists,
        vec!["geometryType.csv"]
    );
}

#[test]
fn test_unknown_extension_version_is_fatal() {
    let builder = builder(&[("charges", "master"), ("location", "v9.9.9")]);
    let err = builder.extensions().unwrap_err();
    assert!(matches!(
        err,
        BuildError::ExtensionNotFound { ref id, ref version } if id == "location" && version == "v9.9.9"
    ));
}

// ---------------------------------------------------------------------------
// Release schema
// ---------------------------------------------------------------------------

#[test]
fn test_release_schema_patch() {
    let builder = builder(&[("ppp", "v1.1.3"), ("location", "v1.1.3")]);
    let result = builder.release_schema_patch().unwrap();

    // Merges patches.
    assert!(result["definitions"].get("Location").is_some());

    // Preserves null values.
    assert_eq!(result["properties"]["buyer"], Value::Null);
    assert!(result["properties"].as_object().unwrap().contains_key("buyer"));
}

#[test]
fn test_release_schema_patch_keeps_registration_order() {
    let builder = builder(&[("charges", "master"), ("location", "v1.1.3")]);
    let result = builder.release_schema_patch().unwrap();
    assert_eq!(result["definitions"]["Charge"]["properties"]["id"], Value::Null);

    let builder = self::builder(&[("location", "v1.1.3"), ("charges", "master")]);
    let result = builder.release_schema_patch().unwrap();
    assert_eq!(
        result["definitions"]["Charge"]["properties"]["id"],
        json!({"type": "string"})
    );
}

#[test]
fn test_patched_release_schema() {
    let builder = builder(&[("ppp", "v1.1.3"), ("location", "v1.1.3")]);
    let result = builder.patched_release_schema().unwrap();

    // Patches core.
    assert!(result.get("$schema").is_some());
    assert!(result["definitions"].get("Location").is_some());
    assert!(result["properties"].get("preferredBidders").is_some());

    // Removes null'ed fields.
    assert!(result["properties"].get("buyer").is_none());
    assert!(result["properties"].get("ocid").is_some());
}

// ---------------------------------------------------------------------------
// Codelists
// ---------------------------------------------------------------------------

#[test]
fn test_codelist_patches() {
    let builder = builder(&[
        ("ppp", "v1.1.3"),
        ("enquiries", "v1.1.3"),
        ("charges", "master"),
        ("tariffs", "master"),
    ]);
    let result = builder.codelist_patches().unwrap();

    assert_eq!(
        result.value.keys().collect::<Vec<_>>(),
        [
            "+partyRole.csv",
            "-partyRole.csv",
            "initiationType.csv",
            "documentType.csv",
            "metricID.csv",
            "chargePaidBy.csv",
        ]
    );

    // Sets Extension value and preserves other values.
    let initiation = &result.value["initiationType.csv"];
    let last = &initiation[initiation.len() - 1];
    assert_eq!(last.code(), "ppp");
    assert_eq!(last.get("Title"), Some("Public Private Partnership"));
    assert!(
        last.get("Description")
            .unwrap()
            .starts_with("An open competitive bidding or tendering ")
    );
    assert_eq!(last.extension_name(), "OCDS for PPPs Extension");

    // Combines codelist additions.
    let added = &result.value["+partyRole.csv"];
    assert_eq!(added.codes(), vec!["publicAuthority", "enquirer"]);
    assert_eq!(added[1].extension_name(), "Enquiries");

    // Identical codelists from two extensions are kept once.
    assert_eq!(result.value["chargePaidBy.csv"].len(), 2);
    assert_eq!(result.value["chargePaidBy.csv"][0].extension_name(), "Charges");

    // Logs ignored codelists.
    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Info);
    assert_eq!(
        diagnostic.message,
        "documentType.csv has the codes added by +documentType.csv, ignoring +documentType.csv"
    );
}

#[test]
fn test_extension_codelists_are_not_collapsed() {
    let builder = builder(&[("ppp", "v1.1.3"), ("tariffs", "master")]);
    let result = builder.extension_codelists().unwrap();

    assert!(result.value.contains_key("+documentType.csv"));
    assert!(result.value.contains_key("documentType.csv"));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_patched_codelists() {
    let builder = builder(&[("ppp", "v1.1.3"), ("charges", "master"), ("tariffs", "master")]);
    let result = builder.patched_codelists().unwrap();

    let mut expected: Vec<&str> = STANDARD_CODELISTS.to_vec();
    expected.extend(["metricID.csv", "chargePaidBy.csv"]);
    assert_eq!(result.value.keys().collect::<Vec<_>>(), expected);

    // Removes deprecated codes.
    let award_criteria = &result.value["awardCriteria.csv"];
    assert_eq!(award_criteria.len(), 4);
    assert_eq!(award_criteria[3].code(), "ratedCriteria");
    assert_eq!(award_criteria[3].extension_name(), "OCDS Core");

    // Adds codes.
    assert!(result.value["partyRole.csv"].contains_code("publicAuthority"));

    // Removes codes.
    assert!(!result.value["partyRole.csv"].contains_code("buyer"));

    // Replaces list.
    assert!(result.value["initiationType.csv"].iter().all(|row| row.code() == "ppp"));

    // Untouched codelists are identical to the standard's.
    let standard = builder.standard_codelists().unwrap().value;
    assert_eq!(result.value["milestoneType.csv"], standard["milestoneType.csv"]);
    assert_eq!(result.value["awardCriteria.csv"], standard["awardCriteria.csv"]);

    // Logs deprecated codes and ignored codelists.
    let messages = result.diagnostics.messages();
    assert_eq!(messages.len(), 5);
    for (i, code) in ["lowestCost", "bestProposal", "bestValueToGovernment", "singleBidOnly"]
        .iter()
        .enumerate()
    {
        assert_eq!(
            messages[i],
            format!("... skipping deprecated code {code} in awardCriteria.csv")
        );
    }
    assert_eq!(
        messages[4],
        "documentType.csv has the codes added by +documentType.csv, ignoring +documentType.csv"
    );
}

#[test]
fn test_additions_from_two_extensions_are_appended_in_order() {
    let builder = builder(&[("enquiries", "v1.1.3"), ("bids", "v1.1.3")]);
    let result = builder.patched_codelists().unwrap();

    assert_eq!(
        result.value["partyRole.csv"].codes(),
        vec!["buyer", "supplier", "payer", "enquirer", "bidder"]
    );
    let extensions: Vec<&str> = result.value["partyRole.csv"]
        .iter()
        .map(|row| row.extension_name())
        .collect();
    assert_eq!(
        extensions,
        vec!["OCDS Core", "OCDS Core", "OCDS Core", "Enquiries", "Bid statistics"]
    );
}

#[test]
fn test_removals_from_two_extensions_are_concatenated_in_order() {
    let builder = builder(&[("ppp", "v1.1.3"), ("retired", "v1.1.3")]);

    let patches = builder.codelist_patches().unwrap();
    let removed = &patches.value["-partyRole.csv"];
    assert_eq!(removed.codes(), vec!["buyer", "payer"]);
    assert_eq!(
        removed.extension_names(),
        vec!["OCDS for PPPs Extension", "Retired roles"]
    );

    let result = builder.patched_codelists().unwrap();
    assert_eq!(
        result.value["partyRole.csv"].codes(),
        vec!["supplier", "publicAuthority"]
    );
}

#[test]
fn test_extension_names_follow_configured_language() {
    let mut config = ProfileConfig::new("1__1__3")
        .with_registry_base_url(REGISTRY_BASE_URL)
        .with_extension("enquiries", "v1.1.3")
        .with_extension("location", "v1.1.3");
    config.language = "es".to_string();
    let builder = ProfileBuilder::new(config, source(), standard());

    let result = builder.codelist_patches().unwrap();
    assert_eq!(result.value["+partyRole.csv"][0].extension_name(), "Consultas");
    // Falls back to English.
    assert_eq!(result.value["geometryType.csv"][0].extension_name(), "Location");
    assert_eq!(
        result.diagnostics.messages(),
        vec!["... skipping deprecated code Box in geometryType.csv"]
    );
}

#[test]
fn test_standard_codelists() {
    let builder = builder(&[]);
    let result = builder.standard_codelists().unwrap();

    assert_eq!(result.value.keys().collect::<Vec<_>>(), STANDARD_CODELISTS);

    // Removes Deprecated column.
    assert_eq!(
        result.value["awardCriteria.csv"].fieldnames(),
        vec!["Code", "Title", "Description", "Extension"]
    );

    // Removes deprecated codes.
    assert_eq!(result.value["awardCriteria.csv"].len(), 4);
    assert_eq!(result.diagnostics.len(), 4);
    assert!(result.diagnostics.iter().all(|d| d.severity == Severity::Info));
}

#[test]
fn test_different_codelists_across_extensions_are_fatal() {
    let builder = builder(&[("charges", "master"), ("conflicting", "master")]);
    let err = builder.codelist_patches().unwrap_err();

    assert!(matches!(err, BuildError::Resolve(ResolveError::InconsistentCodelist { .. })));
    assert!(err.to_string().contains("codelist chargePaidBy.csv is different across extensions"));
    assert!(err.to_string().contains("Conflicting"));
}

#[test]
fn test_addition_missing_from_replacement_is_fatal() {
    let builder = builder(&[("ppp", "v1.1.3"), ("inconsistent", "master")]);
    let err = builder.patched_codelists().unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknownNotice added by +documentType.csv (Inconsistent), but not in documentType.csv (OCDS for PPPs Extension)"
    );
}

// ---------------------------------------------------------------------------
// Standard files
// ---------------------------------------------------------------------------

#[test]
fn test_get_standard_file_contents() {
    let builder = builder(&[]);
    let first = builder.get_standard_file_contents("release-schema.json").unwrap();
    // Repeat requests return the same cached content.
    let second = builder.get_standard_file_contents("release-schema.json").unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(serde_json::from_str::<Value>(first).is_ok());

    let err = builder.get_standard_file_contents("missing.json").unwrap_err();
    assert!(matches!(err, BuildError::MissingStandardFile { .. }));
}

// ---------------------------------------------------------------------------
// Build and write
// ---------------------------------------------------------------------------

#[test]
fn test_build_and_write_profile() {
    let builder = builder(&[("ppp", "v1.1.3"), ("enquiries", "v1.1.3"), ("tariffs", "master")]);
    let profile = builder.build().unwrap();

    assert_eq!(profile.extensions.len(), 3);
    assert!(profile.extension_codelists.contains_key("+documentType.csv"));
    assert!(!profile.patched_codelists.contains_key("+documentType.csv"));

    let dir = tempfile::tempdir().unwrap();
    let written = write_profile(dir.path(), &profile).unwrap();
    assert!(written.iter().all(|path| path.exists()));

    let patch = std::fs::read_to_string(dir.path().join("release-schema.json")).unwrap();
    assert!(patch.contains("\"buyer\": null"));
    assert!(patch.ends_with("}\n"));

    let patched: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("patched-release-schema.json")).unwrap(),
    )
    .unwrap();
    assert!(patched["properties"].get("buyer").is_none());

    assert!(dir.path().join("codelists/+partyRole.csv").exists());
    assert!(dir.path().join("codelists/+documentType.csv").exists());

    let party_role =
        std::fs::read_to_string(dir.path().join("compiledCodelists/partyRole.csv")).unwrap();
    assert_eq!(
        party_role,
        "Code,Title,Description,Extension\n\
         supplier,Supplier,,OCDS Core\n\
         payer,Payer,,OCDS Core\n\
         publicAuthority,Public authority,,OCDS for PPPs Extension\n\
         enquirer,Enquirer,,Enquiries\n"
    );
}

#[test]
fn test_build_from_mirror_directory() {
    let mirror = tempfile::tempdir().unwrap();
    let source = MirrorSource::new(mirror.path());
    for (url, content) in remote_files() {
        let path = source.path_for(&url);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    assert!(source.fetch(&format!("{REGISTRY_BASE_URL}extension_versions.csv")).is_ok());

    let config = ProfileConfig::new("1__1__3")
        .with_registry_base_url(REGISTRY_BASE_URL)
        .with_extension("charges", "master")
        .with_extension("tariffs", "master");
    let profile = ProfileBuilder::new(config, source, standard()).build().unwrap();

    assert_eq!(profile.patched_codelists["chargePaidBy.csv"].len(), 2);
    assert_eq!(
        profile.patched_codelists["documentType.csv"].codes(),
        vec!["tenderNotice", "awardNotice", "tariffNotice"]
    );
    assert!(profile.release_schema_patch["definitions"].get("Charge").is_some());
}
