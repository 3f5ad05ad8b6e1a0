//! Universal Chess Interface front-end.
//!
//! A line loop over stdin. `go` runs on a worker thread so `stop` stays
//! responsive; everything else mutates the engine in place.

use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::engine::Engine;
use crate::search::{smp_search, InfoCallback, Limits, SearchInfo};

const ENGINE_NAME: &str = concat!("sable ", env!("CARGO_PKG_VERSION"));

/// UCI command types that can be parsed from input
#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption {
        name: String,
        value: String,
    },
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoParams),
    Stop,
    Quit,
    Display,
}

#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub infinite: bool,
}

/// Parse one line of UCI input.
#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    match parts[0] {
        "uci" => Some(UciCommand::Uci),
        "isready" => Some(UciCommand::IsReady),
        "ucinewgame" => Some(UciCommand::UciNewGame),
        "stop" => Some(UciCommand::Stop),
        "quit" => Some(UciCommand::Quit),
        "d" => Some(UciCommand::Display),
        "setoption" => {
            // setoption name <name...> value <value...>
            let name_at = parts.iter().position(|&p| p == "name")? + 1;
            let value_at = parts.iter().position(|&p| p == "value");
            let name_end = value_at.unwrap_or(parts.len());
            let name = parts.get(name_at..name_end)?.join(" ");
            let value = value_at
                .map(|at| parts[at + 1..].join(" "))
                .unwrap_or_default();
            Some(UciCommand::SetOption { name, value })
        }
        "position" => {
            let mut i = 1;
            let fen = match parts.get(i) {
                Some(&"startpos") => {
                    i += 1;
                    None
                }
                Some(&"fen") => {
                    let end = parts
                        .iter()
                        .position(|&p| p == "moves")
                        .unwrap_or(parts.len());
                    let fen = parts.get(i + 1..end)?.join(" ");
                    i = end;
                    Some(fen)
                }
                _ => return None,
            };
            let mut moves = Vec::new();
            if parts.get(i) == Some(&"moves") {
                moves = parts[i + 1..].iter().map(ToString::to_string).collect();
            }
            Some(UciCommand::Position { fen, moves })
        }
        "go" => {
            let mut params = GoParams::default();
            let mut i = 1;
            while i < parts.len() {
                let argument = parts.get(i + 1).and_then(|v| v.parse::<u64>().ok());
                match parts[i] {
                    "depth" => params.depth = argument.map(|d| d as i32),
                    "movetime" => params.movetime = argument,
                    "wtime" => params.wtime = argument,
                    "btime" => params.btime = argument,
                    "winc" => params.winc = argument,
                    "binc" => params.binc = argument,
                    "movestogo" => params.movestogo = argument,
                    "infinite" => {
                        params.infinite = true;
                        i += 1;
                        continue;
                    }
                    _ => {
                        i += 1;
                        continue;
                    }
                }
                i += 2;
            }
            Some(UciCommand::Go(params))
        }
        _ => None,
    }
}

/// Translate `go` parameters into search limits for the side to move.
#[must_use]
pub fn limits_from_go(params: &GoParams, white_to_move: bool) -> Limits {
    if let Some(depth) = params.depth {
        return Limits::Depth(depth);
    }
    if let Some(ms) = params.movetime {
        return Limits::MoveTime(ms);
    }
    if params.infinite {
        return Limits::Infinite;
    }

    let (time, inc) = if white_to_move {
        (params.wtime, params.winc)
    } else {
        (params.btime, params.binc)
    };
    match time {
        Some(time_ms) => Limits::SelfClock {
            time_ms,
            inc_ms: inc.unwrap_or(0),
            moves_to_go: params.movestogo,
        },
        None => Limits::Infinite,
    }
}

fn print_info(info: &SearchInfo) {
    let score = match info.mate_in {
        Some(mate) => format!("mate {mate}"),
        None => format!("cp {}", info.score),
    };
    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        info.depth,
        info.seldepth,
        score,
        info.nodes,
        info.nps,
        info.hashfull,
        info.time_ms,
        info.pv
    );
}

/// Run the blocking UCI loop over stdin until `quit`.
pub fn run_uci_loop() {
    let mut engine = Engine::new();
    let mut search_handle: Option<JoinHandle<()>> = None;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Some(command) = parse_uci_command(&line) else {
            continue;
        };

        match command {
            UciCommand::Uci => {
                println!("id name {ENGINE_NAME}");
                println!("id author the sable authors");
                println!("option name Hash type spin default 16 min 1 max 65536");
                println!("option name Threads type spin default 1 min 1 max 256");
                println!("option name UCI_Chess960 type check default false");
                println!("option name MoveOverhead type spin default 50 min 0 max 10000");
                println!("uciok");
            }
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => {
                join_search(&mut search_handle);
                engine.new_game();
            }
            UciCommand::SetOption { name, value } => {
                join_search(&mut search_handle);
                apply_option(&mut engine, &name, &value);
            }
            UciCommand::Position { fen, moves } => {
                join_search(&mut search_handle);
                let ok = match fen {
                    Some(fen) => engine.set_position(&fen).map_err(|e| e.to_string()),
                    None => {
                        engine.set_startpos();
                        Ok(())
                    }
                };
                match ok {
                    Ok(()) => {
                        for mv in &moves {
                            if let Err(e) = engine.apply_move(mv) {
                                eprintln!("info string {e}");
                                break;
                            }
                        }
                    }
                    Err(e) => eprintln!("info string {e}"),
                }
            }
            UciCommand::Go(params) => {
                join_search(&mut search_handle);
                search_handle = Some(spawn_go(&engine, &params));
            }
            UciCommand::Stop => {
                engine.stop();
                join_search(&mut search_handle);
            }
            UciCommand::Display => println!("{}", engine.position()),
            UciCommand::Quit => {
                engine.stop();
                join_search(&mut search_handle);
                break;
            }
        }
    }
}

/// Start the search on its own thread and print `bestmove` when done.
fn spawn_go(engine: &Engine, params: &GoParams) -> JoinHandle<()> {
    let pos = engine.position().clone();
    let tt = Arc::clone(engine.transposition_table());
    let threads = engine.threads();
    let time_config = *engine.time_config();
    let stop = engine.stop_handle();
    stop.store(false, std::sync::atomic::Ordering::Relaxed);
    let limits = limits_from_go(params, pos.side_to_move() == crate::board::Color::White);

    std::thread::spawn(move || {
        let callback: InfoCallback = Arc::new(print_info);
        let result = smp_search(&pos, &tt, threads, limits, &time_config, Some(callback), stop);

        match result.best_move {
            Some(best) => match result.ponder_move {
                Some(ponder) => {
                    // The ponder move is spelled from the position after best.
                    let mut after = pos.clone();
                    let undo = after.apply(best);
                    let ponder_str = after.move_to_uci(ponder);
                    if let Some(undo) = undo {
                        after.revert(best, undo);
                    }
                    println!("bestmove {} ponder {}", pos.move_to_uci(best), ponder_str);
                }
                None => println!("bestmove {}", pos.move_to_uci(best)),
            },
            None => println!("bestmove 0000"),
        }
    })
}

fn join_search(handle: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = handle.take() {
        let _ = handle.join();
    }
}

fn apply_option(engine: &mut Engine, name: &str, value: &str) {
    match name.to_ascii_lowercase().as_str() {
        "hash" => match value.parse::<usize>() {
            Ok(mb) if mb >= 1 => engine.set_hash_mb(mb),
            _ => eprintln!("info string invalid Hash value '{value}'"),
        },
        "threads" => match value.parse::<usize>() {
            Ok(n) if n >= 1 => engine.set_threads(n),
            _ => eprintln!("info string invalid Threads value '{value}'"),
        },
        "uci_chess960" => match value.parse::<bool>() {
            Ok(flag) => engine.set_chess960(flag),
            Err(_) => eprintln!("info string invalid UCI_Chess960 value '{value}'"),
        },
        "moveoverhead" => match value.parse::<u64>() {
            Ok(ms) => engine.set_move_overhead(ms),
            Err(_) => eprintln!("info string invalid MoveOverhead value '{value}'"),
        },
        _ => eprintln!("info string unknown option '{name}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_position_with_moves() {
        let cmd = parse_uci_command("position startpos moves e2e4 e7e5").unwrap();
        match cmd {
            UciCommand::Position { fen, moves } => {
                assert!(fen.is_none());
                assert_eq!(moves, vec!["e2e4", "e7e5"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_position_with_fen_and_moves() {
        let line = "position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4";
        match parse_uci_command(line).unwrap() {
            UciCommand::Position { fen, moves } => {
                assert_eq!(fen.as_deref(), Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"));
                assert_eq!(moves, vec!["e2e4"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_go_clock_parameters() {
        match parse_uci_command("go wtime 30000 btime 29000 winc 100 binc 100 movestogo 20")
            .unwrap()
        {
            UciCommand::Go(params) => {
                assert_eq!(params.wtime, Some(30000));
                assert_eq!(params.btime, Some(29000));
                assert_eq!(params.movestogo, Some(20));
                assert!(!params.infinite);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_setoption_with_spaces() {
        match parse_uci_command("setoption name Move Overhead value 120").unwrap() {
            UciCommand::SetOption { name, value } => {
                assert_eq!(name, "Move Overhead");
                assert_eq!(value, "120");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn go_params_pick_the_movers_clock() {
        let params = GoParams {
            wtime: Some(60_000),
            btime: Some(30_000),
            winc: Some(1000),
            binc: Some(500),
            ..Default::default()
        };
        assert_eq!(
            limits_from_go(&params, false),
            Limits::SelfClock {
                time_ms: 30_000,
                inc_ms: 500,
                moves_to_go: None
            }
        );
    }

    #[test]
    fn depth_beats_clock_parameters() {
        let params = GoParams {
            depth: Some(9),
            wtime: Some(60_000),
            ..Default::default()
        };
        assert_eq!(limits_from_go(&params, true), Limits::Depth(9));
    }
}
