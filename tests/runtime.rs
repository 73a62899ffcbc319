use std::path::Path;

use async_graphql_parser::parse_query;
use graphql_elm::emit::Module;
use graphql_elm::runtime::{ElmValue, Runtime};
use graphql_elm::schema::Schema;
use graphql_elm::{translate_document, DecodeError, GenerateOptions};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn module(query: &str) -> Module {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/starwars.graphql");
    let schema = Schema::load(&path).expect("fixture schema loads");
    let document = parse_query(query).expect("valid query");
    translate_document(&schema, &document, &GenerateOptions::new("Queries", "/graphql"))
        .expect("translates")
}

#[test]
fn scalar_nullability_decides_soft_failure() {
    let module = module("query Hero { hero { id name } }");
    let runtime = Runtime::new(&module);

    let decoded = runtime
        .decode_response("Hero", &json!({"hero": {"id": "1000", "name": null}}))
        .expect("decodes");
    assert_eq!(
        decoded.to_string(),
        r#"{ hero = Just { id = "1000", name = Nothing } }"#
    );

    let missing_id = runtime.decode_response("Hero", &json!({"hero": {"name": "Luke"}}));
    assert_eq!(
        missing_id.expect("nullable hero absorbs the failure").to_string(),
        "{ hero = Nothing }"
    );
}

#[test]
fn required_fields_fail_the_whole_decode() {
    let module = module("query Scores { scores }");
    let runtime = Runtime::new(&module);
    assert_eq!(
        runtime
            .decode_response("Scores", &json!({"scores": [1, null, 3]}))
            .expect("decodes")
            .to_string(),
        "{ scores = [Just 1,Nothing,Just 3] }"
    );
    assert_eq!(
        runtime.decode_response("Scores", &json!({})),
        Err(DecodeError::MissingField("scores".into()))
    );
    assert!(matches!(
        runtime.decode_response("Scores", &json!({"scores": "nope"})),
        Err(DecodeError::InField { .. })
    ));
}

#[test]
fn unions_dispatch_by_typename() {
    let module = module(indoc! {"
        query Pets {
          pets {
            __typename
            ... on Dog { name barks }
            ...CatParts
          }
        }
        fragment CatParts on Cat { name lives }
    "});
    let runtime = Runtime::new(&module);

    let decoded = runtime
        .decode_response(
            "Pets",
            &json!({"pets": [
                {"__typename": "Dog", "name": "Rex", "barks": true},
                {"__typename": "Cat", "name": "Tom", "lives": 9}
            ]}),
        )
        .expect("decodes");
    assert_eq!(
        decoded.to_string(),
        r#"{ pets = [Pet_Dog { name = "Rex", barks = Just True },Pet_Cat { name = "Tom", lives = Just 9 }] }"#
    );

    let error = runtime
        .decode_response("Pets", &json!({"pets": [{"__typename": "Fish", "name": "Nemo"}]}))
        .expect_err("unknown member");
    assert_eq!(
        error,
        DecodeError::InField {
            field: "pets".into(),
            source: Box::new(DecodeError::AtIndex {
                index: 0,
                source: Box::new(DecodeError::UnexpectedUnionType("Fish".into())),
            }),
        }
    );
}

#[test]
fn every_enum_value_round_trips() {
    let module = module("query Hero($episode: Episode) { hero(episode: $episode) { appearsIn } }");
    let runtime = Runtime::new(&module);

    for wire in ["NEWHOPE", "EMPIRE", "JEDI"] {
        let decoded = runtime
            .decode_response("Hero", &json!({"hero": {"appearsIn": [wire]}}))
            .expect("decodes");
        let hero = decoded.get("hero").expect("hero field");
        let ElmValue::Maybe(Some(hero)) = hero else {
            panic!("expected Just, got {hero}");
        };
        let ElmValue::List(episodes) = hero.get("appearsIn").expect("appearsIn") else {
            panic!("expected a list");
        };
        let params = ElmValue::record([("episode", episodes[0].clone())]);
        assert_eq!(
            runtime.encode_variables("Hero", &params),
            Ok(json!({"episode": wire}))
        );
    }

    assert!(matches!(
        runtime.decode_response("Hero", &json!({"hero": {"appearsIn": ["PHANTOM"]}})),
        Ok(ElmValue::Record(_))
    ));
}

#[test]
fn variables_encode_with_their_wire_names() {
    let module = module(indoc! {"
        mutation CreateReview($episode: Episode = JEDI, $review: ReviewInput!) {
          createReview(episode: $episode, review: $review) { stars createdAt }
        }
    "});
    let runtime = Runtime::new(&module);

    let params = ElmValue::record([
        ("episode", ElmValue::nothing()),
        (
            "review",
            ElmValue::record([
                ("stars", ElmValue::Int(5)),
                ("commentary", ElmValue::just(ElmValue::String("Great".into()))),
                ("episode", ElmValue::just(ElmValue::Tag("Episode_Empire".into()))),
            ]),
        ),
    ]);
    assert_eq!(
        runtime.encode_variables("CreateReview", &params),
        Ok(json!({
            "episode": null,
            "review": {"stars": 5, "commentary": "Great", "episode": "EMPIRE"}
        }))
    );

    let decoded = runtime
        .decode_response(
            "CreateReview",
            &json!({"createReview": {"stars": 5, "createdAt": 1_500_000_000}}),
        )
        .expect("decodes");
    assert_eq!(
        decoded.to_string(),
        "{ createReview = Just { stars = 5, createdAt = Just (Time.millisToPosix 1500000000000) } }"
    );
}

#[test]
fn spread_selections_decide_overlapping_fields() {
    let module = module(indoc! {"
        query A { hero { friends { id } ...FriendNames } }
        fragment FriendNames on Character { friends { name } }
    "});
    let runtime = Runtime::new(&module);
    let decoded = runtime
        .decode_response(
            "A",
            &json!({"hero": {"friends": [{"id": "1001", "name": "Han"}]}}),
        )
        .expect("decodes");
    assert_eq!(
        decoded.to_string(),
        r#"{ hero = Just { friends = Just [Just { name = Just "Han" }] } }"#
    );
}

#[test]
fn repeated_member_selections_decode_together() {
    let module = module("query Pets { pets { __typename ... on Dog { name } ... on Dog { barks } } }");
    let runtime = Runtime::new(&module);
    let decoded = runtime
        .decode_response(
            "Pets",
            &json!({"pets": [{"__typename": "Dog", "name": "Rex", "barks": false}]}),
        )
        .expect("decodes");
    assert_eq!(
        decoded.to_string(),
        r#"{ pets = [Pet_Dog { name = "Rex", barks = Just False }] }"#
    );
}
