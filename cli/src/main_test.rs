use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn login_takes_email_and_password_flags() {
    let cli = Cli::try_parse_from(["portal-cli", "login", "--email", "a@b.mn", "--password", "pw"]).unwrap();
    match cli.command {
        Command::Login { email, password } => {
            assert_eq!(email, "a@b.mn");
            assert_eq!(password, "pw");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_parse_before_subcommand() {
    let cli = Cli::try_parse_from(["portal-cli", "--base-url", "https://api.example.mn/", "--session-dir", "/tmp/s", "whoami"])
        .unwrap();
    assert_eq!(cli.base_url.as_deref(), Some("https://api.example.mn/"));
    assert_eq!(cli.session_dir, Some(PathBuf::from("/tmp/s")));
    assert!(matches!(cli.command, Command::Whoami));
}

#[test]
fn verify_token_is_optional() {
    let cli = Cli::try_parse_from(["portal-cli", "verify"]).unwrap();
    assert!(matches!(cli.command, Command::Verify { token: None }));
}

#[test]
fn products_update_flattens_fields() {
    let cli = Cli::try_parse_from(["portal-cli", "products", "update", "4", "--name", "Tea", "--price", "2.5"]).unwrap();
    let Command::Products(ProductsCommand { command: ProductsSubcommand::Update { id, fields } }) = cli.command else {
        panic!("expected products update");
    };
    assert_eq!(id, 4);
    let draft = ProductDraft::from(fields);
    assert_eq!(draft, ProductDraft { name: "Tea".into(), description: String::new(), price: 2.5 });
}

#[test]
fn products_add_requires_price() {
    assert!(Cli::try_parse_from(["portal-cli", "products", "add", "--name", "Tea"]).is_err());
}

#[test]
fn edit_user_fields_are_optional() {
    let cli = Cli::try_parse_from(["portal-cli", "edit-user", "--last-name", "Bold"]).unwrap();
    match cli.command {
        Command::EditUser { first_name, last_name } => {
            assert_eq!(first_name, None);
            assert_eq!(last_name.as_deref(), Some("Bold"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

fn product(id: i64, name: &str) -> Product {
    Product { id, name: name.to_owned(), description: String::new(), price: 1.0 }
}

#[test]
fn updated_product_picks_matching_id() {
    let items = [product(1, "Tea"), product(4, "Milk")];
    assert_eq!(updated_product(&items, 4).unwrap().name, "Milk");
}

#[test]
fn updated_product_missing_from_listing_is_an_error() {
    let items = [product(1, "Tea")];
    let err = updated_product(&items, 4).unwrap_err();
    assert_eq!(err.to_string(), "product 4 not found");
}

#[test]
fn blank_notice_prints_ok() {
    assert_eq!(notice_line(None), "ok");
    assert_eq!(notice_line(Some("  ")), "ok");
    assert_eq!(notice_line(Some("Logged in.")), "Logged in.");
}

#[test]
fn unmounted_form_finishes_quietly() {
    assert!(finish(&Form::new()).is_ok());
}
