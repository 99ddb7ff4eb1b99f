//! Integration tests for reading CSDL JSON documents.

use std::cell::RefCell;
use std::collections::HashMap;

use odata_csdl::{
    read_csdl, ConstantKind, CsdlError, CsdlReader, EdmVersion, Expression, FileResolver,
    MemberRef, PrimitiveKind, TypeReference, UnknownMember,
};
use serde_json::{json, Value};

/// Resolver over in-memory documents that counts fetches per URI.
struct Documents {
    texts: HashMap<&'static str, Value>,
    fetches: RefCell<HashMap<String, usize>>,
}

impl Documents {
    fn new(texts: &[(&'static str, Value)]) -> Self {
        Self {
            texts: texts.iter().cloned().collect(),
            fetches: RefCell::new(HashMap::new()),
        }
    }

    fn fetches(&self, uri: &str) -> usize {
        self.fetches.borrow().get(uri).copied().unwrap_or(0)
    }

    fn resolver(&self) -> impl Fn(&str) -> Option<String> + '_ {
        move |uri: &str| {
            *self.fetches.borrow_mut().entry(uri.to_string()).or_default() += 1;
            self.texts.get(uri).map(Value::to_string)
        }
    }
}

fn include(namespace: &str) -> Value {
    json!({"$Include": [{"$Namespace": namespace}]})
}

// === Annotation Attachment ===

mod annotations {
    use super::*;

    fn product_annotations(members: Value) -> Vec<String> {
        let model = read_csdl(&json!({"$Version": "4.01", "NS": {"Product": members}})).unwrap();
        let product = model.find_structured_type("NS.Product").unwrap();
        let Some(MemberRef::Property(name)) = model.find_member(product, "Name") else {
            panic!("Name should be a property");
        };
        name.annotations
            .iter()
            .map(|a| format!("{}#{}", a.term, a.qualifier.as_deref().unwrap_or("")))
            .collect()
    }

    #[test]
    fn annotation_after_member() {
        let terms = product_annotations(json!({
            "$Kind": "EntityType",
            "Name": {},
            "Name@Core.Description#Short": "name"
        }));
        assert_eq!(terms, ["Core.Description#Short"]);
    }

    #[test]
    fn annotation_before_member() {
        let terms = product_annotations(json!({
            "$Kind": "EntityType",
            "Name@Core.Description#Short": "name",
            "Name": {}
        }));
        assert_eq!(terms, ["Core.Description#Short"]);
    }

    #[test]
    fn qualifier_splits_on_last_hash() {
        let terms = product_annotations(json!({
            "$Kind": "EntityType",
            "Name": {},
            "Name@Core.Description#a#b": "name"
        }));
        assert_eq!(terms, ["Core.Description#a#b"]);
    }

    #[test]
    fn annotation_on_annotation_is_unknown() {
        let mut unknown = Vec::new();
        CsdlReader::new()
            .reporter(&mut unknown)
            .read(&json!({
                "$Version": "4.01",
                "NS": {
                    "Product": {
                        "$Kind": "EntityType",
                        "Name": {},
                        "Name@Core.Description@Core.IsLanguageDependent": true
                    }
                }
            }))
            .unwrap();
        assert_eq!(
            unknown,
            vec![UnknownMember {
                path: "/NS/Product".into(),
                member: "Name@Core.Description@Core.IsLanguageDependent".into()
            }]
        );
    }

    #[test]
    fn unmatched_target_rejects_document() {
        let result = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {"Product": {"$Kind": "EntityType", "Nam@Core.Description": "typo"}}
        }));
        assert!(matches!(
            result,
            Err(CsdlError::AnnotationTargetNotFound { ref target, ref path })
                if target == "Nam" && path == "/NS/Product/Nam@Core.Description"
        ));
    }

    #[test]
    fn out_of_line_annotations() {
        let model = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {
                "@Core.Description": "sales schema",
                "$Annotations": {
                    "NS.Product/Name": {"@Core.Description": "product name"}
                }
            }
        }))
        .unwrap();
        let schema = model.schema("NS").unwrap();
        assert_eq!(schema.annotations.len(), 1);
        assert_eq!(schema.annotation_groups[0].target, "NS.Product/Name");
        assert_eq!(schema.annotation_groups[0].annotations[0].term, "Core.Description");
    }
}

// === Expressions ===

mod expressions {
    use super::*;

    fn annotation_value(value: Value) -> Expression {
        let model = read_csdl(&json!({"$Version": "4.01", "NS": {"@Test.Value": value}})).unwrap();
        model.schemas[0].annotations[0].value.clone()
    }

    #[test]
    fn unquoted_number_is_numeric() {
        let value = annotation_value(json!(3.14));
        assert!(matches!(
            value,
            Expression::Constant { kind: ConstantKind::Decimal | ConstantKind::Floating, .. }
        ));
    }

    #[test]
    fn quoted_number_is_string() {
        let value = annotation_value(json!("3.14"));
        assert_eq!(value, Expression::constant(ConstantKind::String, "3.14"));
    }

    #[test]
    fn integer_and_boolean() {
        assert_eq!(
            annotation_value(json!(42)),
            Expression::constant(ConstantKind::Integer, "42")
        );
        assert_eq!(
            annotation_value(json!(true)),
            Expression::constant(ConstantKind::Boolean, "true")
        );
    }

    #[test]
    fn record_with_type() {
        let value = annotation_value(json!({
            "@type": "https://example.com/$metadata#NS.Money",
            "Amount": 10,
            "Amount@Core.Description": "skipped"
        }));
        let Expression::Record {
            type_ref,
            properties,
        } = value
        else {
            panic!("expected record");
        };
        assert_eq!(type_ref.unwrap().named_type(), Some("NS.Money"));
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].name, "Amount");
    }

    #[test]
    fn if_needs_two_branches() {
        let result = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {"@Test.Value": {"$If": [true]}}
        }));
        assert!(matches!(result, Err(CsdlError::UnexpectedShape { .. })));
    }

    #[test]
    fn apply_must_be_array() {
        let result = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {"@Test.Value": {"$Apply": "concat", "$Function": "odata.concat"}}
        }));
        assert!(matches!(result, Err(CsdlError::UnexpectedShape { .. })));
    }
}

// === Type References ===

mod type_references {
    use super::*;

    #[test]
    fn collection_of_int32() {
        let model = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {
                "Order": {
                    "$Kind": "EntityType",
                    "Numbers": {"$Type": "Edm.Int32", "$Collection": true}
                }
            }
        }))
        .unwrap();
        let order = model.find_structured_type("NS.Order").unwrap();
        assert_eq!(
            order.ty.properties[0].type_ref,
            TypeReference::collection(TypeReference::primitive(PrimitiveKind::Int32))
        );
    }

    #[test]
    fn absent_type_is_unicode_string() {
        let model = read_csdl(&json!({
            "$Version": "4.0",
            "NS": {"T": {"$Kind": "ComplexType", "Name": {"$MaxLength": "max"}}}
        }))
        .unwrap();
        assert_eq!(model.version, EdmVersion::V4_0);
        let ty = model.find_structured_type("NS.T").unwrap();
        let name = &ty.ty.properties[0];
        assert!(!name.nullable);
        assert!(matches!(
            name.type_ref,
            TypeReference::String {
                max_length: Some(odata_csdl::MaxLength::Max),
                unicode: true
            }
        ));
    }
}

// === References ===

mod references {
    use super::*;

    #[test]
    fn empty_reference_is_never_fetched() {
        let documents = Documents::new(&[]);
        let model = CsdlReader::new()
            .resolver(documents.resolver())
            .read(&json!({
                "$Version": "4.01",
                "$Reference": {"b.json": {"$Include": [], "$IncludeAnnotations": []}}
            }))
            .unwrap();
        assert_eq!(model.references.len(), 1);
        assert_eq!(documents.fetches("b.json"), 0);
        assert!(model.referenced_models.is_empty());
    }

    #[test]
    fn shared_reference_read_once() {
        // A -> B, A -> C -> B
        let documents = Documents::new(&[
            (
                "b.json",
                json!({"$Version": "4.01", "B": {"T": {"$Kind": "ComplexType"}}}),
            ),
            (
                "c.json",
                json!({
                    "$Version": "4.01",
                    "$Reference": {"b.json": include("B")},
                    "C": {}
                }),
            ),
        ]);
        let model = CsdlReader::new()
            .resolver(documents.resolver())
            .read(&json!({
                "$Version": "4.01",
                "$Reference": {"b.json": include("B"), "c.json": include("C")}
            }))
            .unwrap();

        assert_eq!(documents.fetches("b.json"), 1);
        assert_eq!(documents.fetches("c.json"), 1);
        let keys: Vec<_> = model.referenced_models.keys().cloned().collect();
        assert_eq!(keys, ["b.json", "c.json"]);
        assert!(model.find_structured_type("B.T").is_some());
    }

    #[test]
    fn reference_cycle_ends() {
        let documents = Documents::new(&[
            (
                "b.json",
                json!({"$Version": "4.01", "$Reference": {"a.json": include("A")}, "B": {}}),
            ),
            (
                "a.json",
                json!({"$Version": "4.01", "$Reference": {"b.json": include("B")}, "A": {}}),
            ),
        ]);
        let model = CsdlReader::new()
            .resolver(documents.resolver())
            .read(&json!({"$Version": "4.01", "$Reference": {"b.json": include("B")}}))
            .unwrap();
        assert_eq!(documents.fetches("b.json"), 1);
        assert_eq!(documents.fetches("a.json"), 1);
        assert_eq!(model.referenced_models.len(), 2);
    }

    #[test]
    fn unresolvable_reference_is_fatal() {
        let result = read_csdl(&json!({
            "$Version": "4.01",
            "$Reference": {"https://example.com/Nowhere.json": include("Nowhere")}
        }));
        assert!(matches!(
            result,
            Err(CsdlError::MissingReferencedDocument { ref uri }) if uri == "https://example.com/Nowhere.json"
        ));
    }

    #[test]
    fn include_alias_finds_referenced_types() {
        let documents = Documents::new(&[(
            "common.json",
            json!({"$Version": "4.01", "Org.Common": {"Address": {"$Kind": "ComplexType"}}}),
        )]);
        let model = CsdlReader::new()
            .resolver(documents.resolver())
            .read(&json!({
                "$Version": "4.01",
                "$Reference": {
                    "common.json": {"$Include": [{"$Namespace": "Org.Common", "$Alias": "Common"}]}
                }
            }))
            .unwrap();
        let address = model.find_structured_type("Common.Address").unwrap();
        assert_eq!(address.qualified_name(), "Org.Common.Address");
    }

    #[test]
    fn file_resolver_with_url_mapping() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("vocab")).unwrap();
        std::fs::write(
            dir.path().join("vocab/Sales.json"),
            r#"{"$Version": "4.01", "Sales": {"Order": {"$Kind": "EntityType"}}}"#,
        )
        .unwrap();

        let resolver = FileResolver::new(dir.path())
            .url_mapping(dir.path().join("vocab"), "https://example.com/odata");
        let model = CsdlReader::new()
            .resolver(resolver)
            .read(&json!({
                "$Version": "4.01",
                "$Reference": {"https://example.com/odata/Sales.json": include("Sales")}
            }))
            .unwrap();
        assert!(model.find_structured_type("Sales.Order").is_some());
    }

    #[cfg(feature = "remote")]
    #[test]
    fn http_resolver_fetches_reference() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/Sales.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"$Version": "4.01", "Sales": {"Order": {"$Kind": "EntityType"}}}"#)
            .create();

        let uri = format!("{}/Sales.json", server.url());
        let document = json!({"$Version": "4.01", "$Reference": {uri.clone(): include("Sales")}});
        let model = CsdlReader::new()
            .resolver(odata_csdl::HttpResolver)
            .read(&document)
            .unwrap();

        mock.assert();
        assert!(model.referenced_models.contains_key(&uri));
        assert!(model.find_structured_type("Sales.Order").is_some());
    }

    #[cfg(feature = "remote")]
    #[test]
    fn http_resolver_error_status_is_missing_document() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/Gone.json").with_status(404).create();

        let uri = format!("{}/Gone.json", server.url());
        let document = json!({"$Version": "4.01", "$Reference": {uri: include("Gone")}});
        let result = CsdlReader::new()
            .resolver(odata_csdl::HttpResolver)
            .read(&document);
        assert!(matches!(result, Err(CsdlError::MissingReferencedDocument { .. })));
    }
}

// === Containers and Operations ===

mod service {
    use super::*;

    #[test]
    fn full_service_document() {
        let model = read_csdl(&json!({
            "$Version": "4.01",
            "$EntityContainer": "Sales.Service",
            "Sales": {
                "$Alias": "S",
                "Customer": {
                    "$Kind": "EntityType",
                    "$Key": ["ID"],
                    "ID": {"$Type": "Edm.Int32"},
                    "Orders": {"$Kind": "NavigationProperty", "$Type": "S.Order", "$Collection": true, "$Partner": "Customer"}
                },
                "Order": {
                    "$Kind": "EntityType",
                    "$Key": ["ID"],
                    "ID": {"$Type": "Edm.Int32"},
                    "Status": {"$Type": "S.Status"},
                    "Customer": {"$Kind": "NavigationProperty", "$Type": "S.Customer", "$Partner": "Orders"}
                },
                "Status": {
                    "$Kind": "EnumType",
                    "Open": 0,
                    "Closed": 1,
                    "Closed@Core.Description": "no further changes"
                },
                "Ship": [{
                    "$Kind": "Action",
                    "$IsBound": true,
                    "$Parameter": [{"$Name": "order", "$Type": "S.Order"}]
                }],
                "Service": {
                    "$Kind": "EntityContainer",
                    "Customers": {
                        "$Collection": true,
                        "$Type": "S.Customer",
                        "$NavigationPropertyBinding": {"Orders": "Orders"}
                    },
                    "Orders": {"$Collection": true, "$Type": "S.Order"}
                }
            }
        }))
        .unwrap();

        let schema = model.schema("Sales").unwrap();
        assert_eq!(schema.alias.as_deref(), Some("S"));
        assert_eq!(schema.structured_types.len(), 2);
        assert_eq!(schema.enum_types[0].members[1].annotations.len(), 1);
        assert_eq!(schema.operations[0].parameters[0].name, "order");
        assert_eq!(schema.entity_containers[0].entity_sets.len(), 2);
        assert_eq!(model.entity_container.as_deref(), Some("Sales.Service"));

        let order = model.find_structured_type("S.Order").unwrap();
        assert_eq!(
            order.ty.properties[1].type_ref.named_type(),
            Some("S.Status")
        );
    }

    #[test]
    fn unknown_kind_is_dropped() {
        let mut unknown = Vec::new();
        let model = CsdlReader::new()
            .reporter(&mut unknown)
            .read(&json!({
                "$Version": "4.01",
                "NS": {
                    "Thing": {"$Kind": "Gadget"},
                    "Bare": {"Name": {}}
                }
            }))
            .unwrap();
        assert!(model.schemas[0].structured_types.is_empty());
        let members: Vec<_> = unknown.iter().map(|u| u.member.as_str()).collect();
        assert_eq!(members, ["Thing", "Bare"]);
    }

    #[test]
    fn model_serializes() {
        let model = read_csdl(&json!({
            "$Version": "4.01",
            "NS": {"T": {"$Kind": "ComplexType", "N": {"$Type": "Edm.Int32"}}}
        }))
        .unwrap();
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["version"], "4.01");
        assert_eq!(value["schemas"][0]["namespace"], "NS");
    }
}
