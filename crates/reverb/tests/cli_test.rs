use clap::Parser;
use reverb::cli::{Cli, Commands, ReviewAction};
use reverb_core::{Platform, ReviewStatus};
use std::path::PathBuf;

#[test]
fn test_global_flags_apply_after_subcommand() {
    let cli = Cli::try_parse_from(["reverb", "credentials", "--profile", "alice", "-v"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.profile, "alice");
    assert!(matches!(cli.command, Commands::Credentials { name: None }));

    let cli = Cli::try_parse_from(["reverb", "credentials", "bob"]).unwrap();
    match cli.command {
        Commands::Credentials { name } => assert_eq!(name.as_deref(), Some("bob")),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_generate_arguments() {
    let cli = Cli::try_parse_from([
        "reverb",
        "generate",
        "items.json",
        "--api-keys",
        "k1,k2",
        "--workers",
        "3",
        "--run",
        "7",
    ])
    .unwrap();

    match cli.command {
        Commands::Generate {
            input,
            api_keys,
            api_key,
            workers,
            run,
            limit,
            model,
        } => {
            assert_eq!(input, PathBuf::from("items.json"));
            assert_eq!(api_keys.as_deref(), Some("k1,k2"));
            assert_eq!(api_key, None);
            assert_eq!(workers, Some(3));
            assert_eq!(run, Some(7));
            assert_eq!(limit, None);
            assert_eq!(model, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_single_key_conflicts_with_key_list() {
    let result = Cli::try_parse_from([
        "reverb",
        "generate",
        "items.json",
        "--api-keys",
        "k1,k2",
        "--api-key",
        "k3",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_review_status_filter_parses_snake_case() {
    let cli = Cli::try_parse_from(["reverb", "review", "list", "--status", "ready_for_approval"])
        .unwrap();
    match cli.command {
        Commands::Review {
            action: ReviewAction::List { status, json },
        } => {
            assert_eq!(status, Some(ReviewStatus::ReadyForApproval));
            assert!(!json);
        }
        other => panic!("unexpected command {other:?}"),
    }

    assert!(Cli::try_parse_from(["reverb", "review", "list", "--status", "pending"]).is_err());
}

#[test]
fn test_approve_requires_ids() {
    assert!(Cli::try_parse_from(["reverb", "review", "approve"]).is_err());

    let cli = Cli::try_parse_from(["reverb", "review", "approve", "1", "2"]).unwrap();
    match cli.command {
        Commands::Review {
            action: ReviewAction::Approve { ids },
        } => assert_eq!(ids, vec!["1", "2"]),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_post_platform_defaults_to_x() {
    let cli = Cli::try_parse_from(["reverb", "post"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Post {
            platform: Platform::X,
            limit: None
        }
    ));

    let cli = Cli::try_parse_from(["reverb", "post", "--platform", "reddit", "--limit", "2"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Post {
            platform: Platform::Reddit,
            limit: Some(2)
        }
    ));
}
