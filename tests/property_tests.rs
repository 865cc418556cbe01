//! Property-based tests for specrun
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs, catching edge cases that hand-written tests might miss.

use proptest::prelude::*;
use specrun::options::OptionSet;
use specrun::remote::protocol::{ServerMessage, decode_frame};
use specrun::runner::{DEFAULT_DRB_PORT, resolve_drb_port};

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

// =============================================================================
// Option parsing properties
// =============================================================================

#[cfg(test)]
mod option_tests {
    use super::*;

    fn colour_flag() -> impl Strategy<Value = (&'static str, bool)> {
        prop_oneof![
            Just(("-c", true)),
            Just(("--color", true)),
            Just(("--colour", true)),
            Just(("--no-color", false)),
        ]
    }

    fn plain_flag() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("-p"), Just("-b"), Just("--profile"), Just("--backtrace"), Just("-d")]
    }

    proptest! {
        /// Property: the last colour flag decides
        #[test]
        fn last_colour_flag_wins(flags in prop::collection::vec(colour_flag(), 1..6)) {
            let args: Vec<&str> = flags.iter().map(|(flag, _)| *flag).collect();
            let options = OptionSet::parse(args).unwrap();
            let expected = flags.last().map(|(_, on)| *on);
            prop_assert_eq!(options.color_enabled(), expected);
        }

        /// Property: a remote run never turns on the debugger
        #[test]
        fn drb_disables_debug(mut flags in prop::collection::vec(plain_flag(), 0..5), position in 0usize..6) {
            let position = position.min(flags.len());
            flags.insert(position, "--drb");
            let options = OptionSet::parse(flags).unwrap();
            prop_assert_eq!(options.debug(), Some(false));
        }

        /// Property: remote argv is the command line minus --drb, --options and --debug, in order
        #[test]
        fn remote_argv_drops_only_local_flags(
            mut flags in prop::collection::vec(plain_flag(), 0..5),
            drb_at in 0usize..6,
            files in prop::collection::vec("[a-z]{1,8}_spec\\.rs", 0..3),
        ) {
            let kept: Vec<String> = flags
                .iter()
                .filter(|f| **f != "-d")
                .map(|f| f.to_string())
                .chain(files.iter().cloned())
                .collect();
            let drb_at = drb_at.min(flags.len());
            flags.insert(drb_at, "-X");
            let mut args: Vec<String> = strings(&flags);
            args.extend(["-o".to_string(), "custom.opts".to_string()]);
            args.extend(files.iter().cloned());

            let options = OptionSet::parse(args).unwrap();
            prop_assert_eq!(options.to_remote_argv(), kept);
        }

        /// Property: a value on the command line always beats the options file, locally and
        /// once the merged set is re-parsed on the server
        #[test]
        fn command_line_wins_merge(
            cli_line in 1u32..500,
            file_line in 1u32..500,
            file_profile: bool,
            cli_files in prop::collection::vec("[a-m]{1,8}_spec\\.rs", 0..3),
            file_files in prop::collection::vec("[n-z]{1,8}_spec\\.rs", 0..3),
        ) {
            let mut cli_args = vec!["--drb".to_string(), "-l".to_string(), cli_line.to_string()];
            cli_args.extend(cli_files.iter().cloned());
            let cli = OptionSet::parse(cli_args).unwrap();
            let mut file_args = file_files.clone();
            file_args.extend(["-l".to_string(), file_line.to_string()]);
            if file_profile {
                file_args.push("-p".to_string());
            }
            let file = OptionSet::parse(file_args).unwrap();

            let merged = cli.merge(file);
            let expected_line = cli_line.to_string();
            let expected_files = if cli_files.is_empty() { &file_files } else { &cli_files };
            prop_assert_eq!(merged.line_number(), Some(expected_line.as_str()));
            prop_assert_eq!(merged.profile_examples(), file_profile.then_some(true));
            prop_assert_eq!(merged.files_or_directories_to_run(), expected_files.as_slice());

            let remote = OptionSet::parse(merged.to_remote_argv()).unwrap();
            prop_assert_eq!(remote.line_number(), Some(expected_line.as_str()));
            prop_assert_eq!(remote.profile_examples(), file_profile.then_some(true));
            prop_assert_eq!(remote.files_or_directories_to_run(), expected_files.as_slice());
        }
    }
}

// =============================================================================
// Remote properties
// =============================================================================

#[cfg(test)]
mod remote_tests {
    use super::*;

    proptest! {
        /// Property: an explicit port always wins, anything unparsable falls back to the default
        #[test]
        fn drb_port_precedence(explicit: Option<u16>, env in proptest::option::of("[0-9a-z]{0,6}")) {
            let port = resolve_drb_port(explicit, env.as_deref());
            match (explicit, env.as_deref().and_then(|v| v.parse::<u16>().ok())) {
                (Some(explicit), _) => prop_assert_eq!(port, explicit),
                (None, Some(from_env)) => prop_assert_eq!(port, from_env),
                (None, None) => prop_assert_eq!(port, DEFAULT_DRB_PORT),
            }
        }

        /// Property: decoding arbitrary bytes returns an error instead of panicking
        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode_frame::<ServerMessage>(&bytes);
        }
    }
}
