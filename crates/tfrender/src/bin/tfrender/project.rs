//! Demo project: an IAM group with its users
//!
//! | **file**           | **contents**                              |
//! |--------------------|-------------------------------------------|
//! | `terraform.tfvars` | the user names                            |
//! | `variables.tf`     | variable definitions, group name default  |
//! | `iam.tf`           | provider, group, users and memberships    |
//!
//! The integration tests use the same project and collections.

use tfrender::block::Block;
use tfrender::collection::{collect, CollectionFactory};
use tfrender::kwargs;
use tfrender::producer::{producer, Co, ProducerFn};
use tfrender::value::{Mapping, Value};
use tfrender::variables::VariableProxy;

pub fn iam_user() -> CollectionFactory {
    collect("iam_user", |co: Co, var: VariableProxy| async move {
        co.emit(Block::new("variable.name")).await?;
        co.emit(Block::new("variable.path").with("default", "/")).await?;

        let name = var.get("name")?;
        let user = co
            .emit(
                Block::new(format!("resource.aws_iam_user.{name}"))
                    .with("name", name.clone())
                    .with("path", var.get("path")?),
            )
            .await?;

        co.emit(Block::new("output.name").with("value", name)).await?;
        co.emit(Block::new("output.resource").with("value", user)).await?;
        Ok(())
    })
}

pub fn iam_group() -> CollectionFactory {
    collect("iam_group", |co: Co, var: VariableProxy| async move {
        co.emit(Block::new("variable.name")).await?;

        let name = var.get("name")?;
        let group = co
            .emit(Block::new(format!("resource.aws_iam_group.{name}")).with("name", name.clone()))
            .await?;

        co.emit(Block::new("output.name").with("value", name)).await?;
        co.emit(Block::new("output.resource").with("value", group)).await?;
        Ok(())
    })
}

/// One membership resource per user, ordered by user label
pub fn iam_user_group_membership() -> CollectionFactory {
    collect(
        "iam_user_group_membership",
        |co: Co, var: VariableProxy| async move {
            co.emit(Block::new("variable.group")).await?;
            co.emit(Block::new("variable.users")).await?;

            let group = var.get("group")?;
            let group_label = group.as_block().map(Block::label).unwrap_or_default().to_string();

            let users = var.get("users")?;
            let mut users: Vec<_> = users.as_object().into_iter().flatten().collect();
            users.sort_by(|(a, _), (b, _)| a.cmp(b));

            for (user_label, user) in users {
                co.emit(
                    Block::new(format!(
                        "resource.aws_iam_user_group_membership.{user_label}_in_{group_label}"
                    ))
                    .with("groups", vec![group.attr("name")])
                    .with("user", user.attr("name")),
                )
                .await?;
            }

            Ok(())
        },
    )
}

pub fn iam_group_with_users() -> CollectionFactory {
    collect("iam_group_with_users", |co: Co, var: VariableProxy| async move {
        co.emit(Block::new("variable.group_name")).await?;
        co.emit(Block::new("variable.user_names")).await?;

        let group = co
            .emit(iam_group().call(kwargs! { "name" => var.get("group_name")? })?)
            .await?;
        let group = group.output("resource")?.clone();

        let mut users = Mapping::new();
        for name in var.get("user_names")?.as_array().unwrap_or_default() {
            let user = co.emit(iam_user().call(kwargs! { "name" => name.clone() })?).await?;
            users.insert(name.to_string(), user.output("resource")?.clone());
        }

        co.emit(iam_user_group_membership().call(kwargs! {
            "group" => group.clone(),
            "users" => users.clone(),
        })?)
        .await?;

        co.emit(Block::new("output.group").with("value", group)).await?;
        co.emit(Block::new("output.users").with("value", users)).await?;
        Ok(())
    })
}

/// `(source path, producer)` of every file in the project
pub fn files() -> Vec<(&'static str, ProducerFn)> {
    let tfvars = producer(|co: Co, _var| async move {
        co.emit(Mapping::from([(
            "user_names".to_string(),
            Value::from(vec!["peanut", "cornelius"]),
        )]))
        .await?;
        Ok(())
    });

    let variables = producer(|co: Co, _var| async move {
        co.emit(
            Block::new("variable.group_name")
                .with("type", "string")
                .with("default", "dogs"),
        )
        .await?;
        co.emit(Block::new("variable.user_names").with("type", "list(string)")).await?;
        co.emit(Block::new("variable.region").with("default", "eu-west-1")).await?;
        Ok(())
    });

    let iam = producer(|co: Co, var: VariableProxy| async move {
        co.emit(Block::new("provider.aws").with("region", var.get("region")?)).await?;

        let group_with_users = co
            .emit(iam_group_with_users().call(kwargs! {
                "group_name" => var.get("group_name")?,
                "user_names" => var.get("user_names")?,
            })?)
            .await?;

        let group = group_with_users.output("group")?;
        co.emit(Block::new("output.group_arn").with("value", group.attr("arn"))).await?;
        Ok(())
    });

    vec![
        ("terraform.tfvars", tfvars),
        ("variables.tf", variables),
        ("iam.tf", iam),
    ]
}
