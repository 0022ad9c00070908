mod common;

use common::{iam_group_with_users, iam_user};
use pretty_assertions::assert_eq;
use serde_json::json;
use tfrender::block::Block;
use tfrender::collection::collect;
use tfrender::kwargs;
use tfrender::producer::{Co, Yielded};
use tfrender::value::Value;
use tfrender::Error;

#[test]
fn group_with_users() {
    let dogs = iam_group_with_users()
        .call(kwargs! {
            "group_name" => "dogs",
            "user_names" => vec!["peanut", "cornelius"],
        })
        .unwrap();

    assert_eq!(
        dogs.to_json().unwrap(),
        json!([
            {"resource": {"aws_iam_group": {"dogs": {"name": "dogs"}}}},
            {"resource": {"aws_iam_user": {"peanut": {"name": "peanut", "path": "/"}}}},
            {"resource": {"aws_iam_user": {"cornelius": {"name": "cornelius", "path": "/"}}}},
            {"resource": {"aws_iam_user_group_membership": {"cornelius_in_dogs": {
                "user": "${aws_iam_user.cornelius.name}",
                "groups": ["${aws_iam_group.dogs.name}"],
            }}}},
            {"resource": {"aws_iam_user_group_membership": {"peanut_in_dogs": {
                "user": "${aws_iam_user.peanut.name}",
                "groups": ["${aws_iam_group.dogs.name}"],
            }}}},
        ])
    );

    let group = dogs.output("group").unwrap().as_block().unwrap();
    assert_eq!(group.path(), "resource.aws_iam_group.dogs");

    let users = dogs.output("users").unwrap().as_object().unwrap();
    assert_eq!(users.keys().collect::<Vec<_>>(), vec!["peanut", "cornelius"]);
    assert_eq!(
        users["peanut"].attr("arn"),
        Some(Value::from(tfrender::block::Reference::new("aws_iam_user.peanut.arn")))
    );
}

#[test]
fn calls_are_isolated() {
    let peanut = iam_user().call(kwargs! { "name" => "peanut" }).unwrap();
    let cornelius = iam_user()
        .call(kwargs! { "name" => "cornelius", "path" => "/dogs/" })
        .unwrap();

    assert_eq!(peanut.output("name").unwrap(), &Value::from("peanut"));
    assert_eq!(cornelius.output("name").unwrap(), &Value::from("cornelius"));

    assert_eq!(
        peanut.to_json().unwrap(),
        json!([{"resource": {"aws_iam_user": {"peanut": {"name": "peanut", "path": "/"}}}}])
    );
    assert_eq!(
        cornelius.to_json().unwrap(),
        json!([{"resource": {"aws_iam_user": {"cornelius": {"name": "cornelius", "path": "/dogs/"}}}}])
    );
}

#[test]
fn output_references() {
    let peanut = iam_user().call(kwargs! { "name" => "peanut" }).unwrap();
    let user = peanut.output("resource").unwrap().as_block().unwrap();

    assert_eq!(user.attr("arn"), "${aws_iam_user.peanut.arn}");
    assert_eq!(user.to_string(), "resource.aws_iam_user.peanut");
}

#[test]
fn undefined_output() {
    let peanut = iam_user().call(kwargs! { "name" => "peanut" }).unwrap();
    let err = peanut.output("arn").expect_err("must error");

    assert!(
        matches!(&err, Error::OutputNotDefined { name, collection }
            if name == "arn" && collection == "iam_user"),
        "{err:?}"
    );
}

#[test]
fn missing_input() {
    let err = iam_user().call(kwargs! {}).expect_err("must error");

    assert!(
        matches!(&err, Error::VariableNotPopulated { name, .. } if name == "name"),
        "{err:?}"
    );
}

#[test]
fn nested_collections_flatten_in_yield_order() {
    let inner = collect("inner", |co: Co, _var| async move {
        co.emit(Block::new("locals").with("step", 2)).await?;
        co.emit(Yielded::from(vec![
            Block::new("locals").with("step", 3),
            Block::new("locals").with("step", 4),
        ]))
        .await?;
        Ok(())
    });

    let outer = collect("outer", move |co: Co, _var| {
        let inner = inner.clone();
        async move {
            co.emit(Block::new("locals").with("step", 1)).await?;
            co.emit(inner.call(kwargs! {})?).await?;
            co.emit(Block::new("locals").with("step", 5)).await?;
            Ok(())
        }
    });

    let steps: Vec<_> = outer
        .call(kwargs! {})
        .unwrap()
        .iter()
        .map(|block| block["locals"].attr("step").unwrap())
        .collect();

    assert_eq!(steps, (1..=5).map(Value::from).collect::<Vec<_>>());
}
