// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn id_arg(name: &'static str) -> Arg {
    Arg::new(name).required(true).value_parser(value_parser!(i64))
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn period_args(cmd: Command) -> Command {
    cmd.arg(
        opt("month", "Month as YYYY-MM")
            .conflicts_with_all(["from", "to"]),
    )
    .arg(opt("from", "First day (YYYY-MM-DD), inclusive"))
    .arg(opt("to", "Last day (YYYY-MM-DD), inclusive"))
}

fn client_cmd() -> Command {
    Command::new("client")
        .about("Client registry")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a client")
                .arg(opt("name", "Full name").required(true))
                .arg(opt("cpf", "CPF, with or without mask").required(true))
                .arg(opt("phone", "Phone with area code").required(true))
                .arg(opt("address", "Street address").required(true))
                .arg(opt("notes", "Free-text notes")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List clients, newest first")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .help("Filter by name, CPF or phone"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("show").about("Show one client").arg(id_arg("id")),
        ))
        .subcommand(
            Command::new("update")
                .about("Edit a client; omitted fields are kept")
                .arg(id_arg("id"))
                .arg(opt("name", "Full name"))
                .arg(opt("cpf", "CPF"))
                .arg(opt("phone", "Phone"))
                .arg(opt("address", "Street address"))
                .arg(opt("notes", "Free-text notes; empty clears")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a client (orders and ledger entries are kept)")
                .arg(id_arg("id")),
        )
}

fn product_cmd() -> Command {
    Command::new("product")
        .about("Inventory registry")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a product")
                .arg(opt("name", "Product name").required(true))
                .arg(
                    opt("quantity", "Units in stock")
                        .value_parser(value_parser!(i64))
                        .allow_negative_numbers(true)
                        .default_value("0"),
                )
                .arg(opt("cost", "Cost price").required(true))
                .arg(opt("price", "Selling price").required(true))
                .arg(opt("supplier", "Supplier name"))
                .arg(opt("supplier-phone", "Supplier phone")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List products, newest first")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .help("Filter by name or supplier"),
                )
                .arg(
                    Arg::new("low")
                        .long("low")
                        .action(ArgAction::SetTrue)
                        .help("Only products at or below the low-stock threshold"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("show").about("Show one product").arg(id_arg("id")),
        ))
        .subcommand(
            Command::new("update")
                .about("Edit a product; omitted fields are kept")
                .arg(id_arg("id"))
                .arg(opt("name", "Product name"))
                .arg(
                    opt("quantity", "Units in stock")
                        .value_parser(value_parser!(i64))
                        .allow_negative_numbers(true),
                )
                .arg(opt("cost", "Cost price"))
                .arg(opt("price", "Selling price"))
                .arg(opt("supplier", "Supplier name; empty clears"))
                .arg(opt("supplier-phone", "Supplier phone; empty clears")),
        )
        .subcommand(
            Command::new("adjust")
                .about("Add or remove units from stock")
                .arg(id_arg("id"))
                .arg(
                    Arg::new("delta")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .allow_negative_numbers(true),
                ),
        )
        .subcommand(Command::new("rm").about("Delete a product").arg(id_arg("id")))
}

fn order_cmd() -> Command {
    Command::new("order")
        .about("Service orders")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Open a service order")
                .arg(
                    opt("client", "Client id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(opt("equipment", "Equipment being repaired").required(true))
                .arg(opt("problem", "Problem reported by the client"))
                .arg(opt("notes", "Internal notes"))
                .arg(opt("date", "Entry date (YYYY-MM-DD), default today")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List service orders, newest first")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .help("Filter by client, equipment or OS code"),
                )
                .arg(opt("status", "Only orders in this status")),
        ))
        .subcommand(json_flags(
            Command::new("show")
                .about("Show an order with its items")
                .arg(id_arg("id")),
        ))
        .subcommand(
            Command::new("update")
                .about("Edit order details; omitted fields are kept")
                .arg(id_arg("id"))
                .arg(opt("equipment", "Equipment"))
                .arg(opt("problem", "Problem description; empty clears"))
                .arg(opt("notes", "Internal notes; empty clears")),
        )
        .subcommand(
            Command::new("item")
                .about("Line items")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Add a line item")
                        .arg(id_arg("order"))
                        .arg(opt("description", "Part or service").required(true))
                        .arg(
                            opt("quantity", "Units")
                                .value_parser(value_parser!(i64))
                                .allow_negative_numbers(true)
                                .default_value("1"),
                        )
                        .arg(opt("unit-price", "Price per unit").required(true)),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Remove a line item")
                        .arg(id_arg("order"))
                        .arg(id_arg("item")),
                ),
        )
        .subcommand(
            Command::new("advance")
                .about("Move the order to its next status")
                .arg(id_arg("id")),
        )
        .subcommand(
            Command::new("status")
                .about("Set the status (current or next step only)")
                .arg(id_arg("id"))
                .arg(Arg::new("status").required(true)),
        )
        .subcommand(
            Command::new("post")
                .about("Record a delivered order's total as income")
                .arg(id_arg("id"))
                .arg(opt("owner", "admin, partner or split").default_value("split"))
                .arg(opt("date", "Ledger date (YYYY-MM-DD), default today")),
        )
        .subcommand(
            Command::new("print")
                .about("Render a printable service order")
                .arg(id_arg("id"))
                .arg(
                    Arg::new("quote")
                        .long("quote")
                        .action(ArgAction::SetTrue)
                        .help("Render as a quote for approval"),
                )
                .arg(opt("out", "Write to this file instead of stdout")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete an order and its items")
                .arg(id_arg("id")),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Ledger entries")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record income or expense")
                .arg(opt("kind", "income or expense").required(true))
                .arg(opt("description", "What it was for").required(true))
                .arg(opt("amount", "Positive amount").required(true))
                .arg(opt("owner", "admin, partner or split").default_value("admin"))
                .arg(opt("client", "Client id").value_parser(value_parser!(i64)))
                .arg(opt("date", "Date (YYYY-MM-DD), default today")),
        )
        .subcommand(json_flags(period_args(
            Command::new("list")
                .about("List ledger entries, newest first")
                .arg(opt("kind", "income or expense"))
                .arg(opt("owner", "admin, partner or split"))
                .arg(opt("client", "Client id").value_parser(value_parser!(i64)))
                .arg(opt("limit", "Max rows").value_parser(value_parser!(usize))),
        )))
        .subcommand(
            Command::new("update")
                .about("Edit an entry; omitted fields are kept")
                .arg(id_arg("id"))
                .arg(opt("kind", "income or expense"))
                .arg(opt("description", "Description"))
                .arg(opt("amount", "Positive amount"))
                .arg(opt("owner", "admin, partner or split"))
                .arg(opt("client", "Client id").value_parser(value_parser!(i64)))
                .arg(
                    Arg::new("no-client")
                        .long("no-client")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("client")
                        .help("Remove the client reference"),
                )
                .arg(opt("date", "Date (YYYY-MM-DD)")),
        )
        .subcommand(Command::new("rm").about("Delete an entry").arg(id_arg("id")))
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Financial reports")
        .subcommand_required(true)
        .subcommand(json_flags(period_args(
            Command::new("summary").about("Totals and partner shares (default: this month)"),
        )))
        .subcommand(json_flags(
            Command::new("daily")
                .about("Income and expense per day")
                .arg(opt("month", "Month as YYYY-MM, default this month")),
        ))
        .subcommand(json_flags(
            Command::new("dashboard").about("This month at a glance"),
        ))
        .subcommand(
            Command::new("print")
                .about("Printable financial report")
                .arg(opt("from", "First day (YYYY-MM-DD)"))
                .arg(opt("to", "Last day (YYYY-MM-DD)"))
                .arg(opt("out", "Write to this file instead of stdout")),
        )
}

fn export_cmd() -> Command {
    let target = |name: &'static str, about: &'static str| {
        Command::new(name)
            .about(about)
            .arg(opt("format", "csv or json").default_value("csv"))
            .arg(opt("out", "Output file").required(true))
    };
    Command::new("export")
        .about("Export records")
        .subcommand_required(true)
        .subcommand(target("transactions", "Export ledger entries"))
        .subcommand(target("clients", "Export clients"))
        .subcommand(target("products", "Export products"))
}

fn config_cmd() -> Command {
    Command::new("config")
        .about("Shop settings")
        .subcommand_required(true)
        .subcommand(Command::new("list").about("Show all settings"))
        .subcommand(
            Command::new("get")
                .about("Show one setting")
                .arg(Arg::new("key").required(true)),
        )
        .subcommand(
            Command::new("set")
                .about("Change a setting")
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("value").required(true)),
        )
}

pub fn build_cli() -> Command {
    Command::new("shopdesk")
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Database file (overrides SHOPDESK_DB)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output to stderr"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(client_cmd())
        .subcommand(product_cmd())
        .subcommand(order_cmd())
        .subcommand(tx_cmd())
        .subcommand(report_cmd())
        .subcommand(export_cmd())
        .subcommand(config_cmd())
        .subcommand(Command::new("doctor").about("Check data health"))
}
