use crate::board::Board;
use crate::moves::execute::{make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::{MAX_PLY, SearchContext};
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const DRAW_SCORE: i32 = -50;

// Node-count interval at which the interrupt flag and clock are polled.
const TIME_CHECK_MASK: u64 = 4095;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP)
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Futility Pruning (FP)
const FP_DEPTH_LIMIT: i32 = 7;
const FP_MARGIN_BASE: i32 = 100;
const FP_MARGIN_MULT: i32 = 100;
const FP_HISTORY_THRESHOLD: i32 = 512;

// Late Move Pruning (LMP)
const LMP_DEPTH_LIMIT: i32 = 14;
const LMP_BASE_MOVES: i32 = 3;
const LMP_MOVE_MULTIPLIER: i32 = 6;

// Late Move Reduction (LMR)
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;

// --- TT Score Adjustment Helpers ---
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// Pseudo-random jitter added to the draw score so repeated draws inside the
/// same search don't collapse to one bit-identical value (breaks some
/// repetition-blindness horizon effects).
fn draw_score(nodes: u64) -> i32 {
    DRAW_SCORE + (nodes & 3) as i32
}
// -----------------------------------

/// Cooperative cancellation flag. A relaxed atomic is sufficient: the only
/// cross-thread state is "stop now", written by the front-end (a `stop`
/// command or a signal handler) and read by the search worker.
pub type Interrupt = Arc<AtomicBool>;

pub struct TimeManager {
    pub start_time: Instant,
    pub hard_limit: Option<Duration>,
    pub soft_limit: Option<Duration>,
    pub stop_signal: bool,
    pub interrupt: Interrupt,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            hard_limit: limit,
            soft_limit: limit,
            stop_signal: false,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_interrupt(limit: Option<Duration>, interrupt: Interrupt) -> Self {
        Self {
            start_time: Instant::now(),
            hard_limit: limit,
            soft_limit: limit,
            stop_signal: false,
            interrupt,
        }
    }

    /// Derives soft/hard budgets from UCI `go` time-control parameters,
    /// mirroring the tiered allocation the front-end uses when parsing
    /// `wtime`/`btime`/`winc`/`binc`/`movestogo`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_clock(
        my_time: u64,
        my_inc: u64,
        movestogo: Option<u64>,
        interrupt: Interrupt,
    ) -> Self {
        let safety_buffer = (my_time * 15 / 100).min(500);
        let usable_time = my_time.saturating_sub(safety_buffer);

        let mut soft: u64 = if let Some(mtg) = movestogo {
            let moves_to_plan = mtg.max(2);
            usable_time / moves_to_plan + (my_inc * 3) / 4
        } else if usable_time > 5000 {
            usable_time / 40 + (my_inc * 9) / 10
        } else if usable_time > 2000 {
            usable_time / 30 + (my_inc * 3) / 4
        } else if usable_time > 500 {
            usable_time / 20 + my_inc / 2
        } else {
            my_inc / 2 + 20
        };

        let hard_cap = usable_time / 5;
        soft = soft.min(hard_cap).min(usable_time);
        if soft < 10 && usable_time >= 10 {
            soft = 10;
        }

        let hard = (soft * 5).min(usable_time);

        Self {
            start_time: Instant::now(),
            hard_limit: Some(Duration::from_millis(hard.max(soft))),
            soft_limit: Some(Duration::from_millis(soft)),
            stop_signal: false,
            interrupt,
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }

        if self.interrupt.load(Ordering::Relaxed) {
            self.stop_signal = true;
            return;
        }

        if let Some(limit) = self.hard_limit {
            let elapsed = self.start_time.elapsed();
            if elapsed >= limit {
                self.stop_signal = true;
            }
        }
    }

    /// True once elapsed time has consumed roughly two-thirds of the soft
    /// budget: the point at which starting another iteration is unlikely to
    /// pay for itself before the hard deadline.
    #[inline(always)]
    pub fn soft_expired(&self) -> bool {
        match self.soft_limit {
            Some(limit) => self.start_time.elapsed() >= (limit * 2) / 3,
            None => false,
        }
    }

    /// Returns the allocated hard time limit.
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.hard_limit
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // Depth cap: quiescence has no depth limit of its own, so bound recursion.
    if ply >= MAX_PLY {
        return static_eval(board, tables, alpha, beta);
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // Standing pat assumes a quiet move is available that is at least as good
    // as doing nothing; in check that assumption is false (the side to move
    // has no quiet option), so it must search every evasion instead.
    let stand_pat = if in_check_now {
        -INF
    } else {
        let sp = static_eval(board, tables, alpha, beta);
        if sp >= beta {
            return beta;
        }
        if sp >= alpha {
            alpha = sp;
        }
        sp
    };

    // In check: every legal move escapes check, so pull the full picker
    // rather than the captures-only one. Otherwise stay in captures/promotion
    // mode as before.
    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, !in_check_now);

    let mut move_count = 0;
    while let Some(mv) = picker.next(board, tables, &empty_history) {
        move_count += 1;
        *nodes += 1;
        if *nodes & TIME_CHECK_MASK == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return alpha;
        }

        if !in_check_now {
            let mut captured_value = 0;
            if let Some(piece) = board.piece_type_at(mv.to) {
                captured_value = piece.value();
            }

            // Delta pruning: skip captures that can't plausibly raise alpha.
            // Promotions and en passant are excluded since captured_value alone
            // understates their material swing.
            let is_prom = mv.is_promotion();
            let is_ep = mv.is_en_passant();

            if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
                continue;
            }

            // MovePicker already filters bad captures by SEE; promotions and en
            // passant bypass that classification, so check them here too.
            if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
                continue;
            }
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    if in_check_now && move_count == 0 {
        return -MATE_SCORE + ply as i32;
    }

    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> (i32, Option<Move>) {
    ctx.clear_pv(ply.min(MAX_PLY - 1));

    if *nodes & TIME_CHECK_MASK == 0 {
        time.check_time();
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    // Non-root draws: 50-move rule and repetition.
    if ply > 0 {
        if board.halfmove_clock >= 100 {
            return (draw_score(*nodes), None);
        }
        if board.is_repetition() {
            return (draw_score(*nodes), None);
        }
    }

    // Mate-distance pruning: no line from here can be better than mating on
    // the very next ply, nor worse than being mated here.
    if ply > 0 {
        let mating_value = MATE_SCORE - ply as i32;
        if mating_value < beta {
            beta = mating_value;
            if alpha >= beta {
                return (beta, None);
            }
        }
        let mated_value = -MATE_SCORE + ply as i32;
        if mated_value > alpha {
            alpha = mated_value;
            if alpha >= beta {
                return (alpha, None);
            }
        }
    }

    let hash = board.zobrist;
    let mut hash_move = None;

    // TT PROBE WITH MATE SCORE ADJUSTMENT
    if let Some((tt_move, raw_score, tt_depth, tt_bound)) =
        tt.probe(hash, depth as u8, alpha, beta, ply as i32)
    {
        if let Some(tm) = tt_move {
            hash_move = Some(tm);
        }

        if tt_depth >= depth as u8 {
            // Convert the stored independent score back to relative score
            let tt_score = score_from_tt(raw_score, ply as i32);

            if ply > 0 {
                match tt_bound {
                    0 => return (tt_score, tt_move),
                    1 if tt_score >= beta => return (tt_score, tt_move),
                    2 if tt_score <= alpha => return (tt_score, tt_move),
                    _ => {}
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // Check extension: extend by 1 ply when in check.
    let extension = if in_check_now { 1 } else { 0 };

    if (depth <= 0 && !in_check_now) || ply >= MAX_PLY {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    // Shared by RFP and futility pruning below.
    let static_eval_val = if !in_check_now {
        static_eval(board, tables, alpha, beta)
    } else {
        0 // Dummy value, we won't use it if in check
    };

    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }

    // Null-move pruning: skip our move once and search with a reduced depth
    // and null window. Only tried when already ahead on material/position.
    if depth >= 4
        && !in_check_now
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    {
        let r = if depth > 6 { 3 } else { 2 };

        let undo = make_null_move(board);

        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
        );
        let score = -val;
        undo_null_move(board, undo);

        // Don't trust a mate score returned through a null move; re-search normally.
        if score >= beta && !time.stop_signal && score < MATE_THRESHOLD {
            return (beta, None);
        }
    }

    // Use MovePicker for staged move generation
    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply.min(MAX_PLY - 1)], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        // Futility pruning: skip quiet moves when hopelessly below alpha.
        if depth < FP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && move_count > 0
        {
            let margin = FP_MARGIN_BASE + FP_MARGIN_MULT * depth;

            // A move with a strong history score has proven good elsewhere;
            // don't let a pessimistic static eval prune it.
            let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];

            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue;
            }
        }

        // Late move pruning: stop generating quiet moves once plenty have
        // already been tried without raising alpha.
        if depth < LMP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && alpha == original_alpha
        {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
            );
            score = -val;
        } else {
            // Late move reduction: search late quiet moves at reduced depth
            // with a null window first, re-searching at full depth if they
            // beat alpha.
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && !mv.is_capture()
                && !mv.is_promotion()
                && !in_check_now
            {
                r = 1 + (depth / 8) + (move_count as i32 / 20);

                let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1;
                }

                // Reduce less inside an open (PV) window.
                if beta - alpha > 1 {
                    r -= 1;
                }

                r = r.clamp(0, depth - 2);
            }

            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
            );
            score = -val;

            // Re-search if the reduced search found a surprisingly good move
            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
                if ply + 1 < MAX_PLY {
                    ctx.record_pv(ply, mv);
                }
            }
            if score >= beta {
                // TT SAVE WITH MATE SCORE ADJUSTMENT (LowerBound/Beta Cutoff)
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if !mv.is_capture() {
                    ctx.update_killer(ply.min(MAX_PLY - 1), mv);

                    let bonus = depth * depth;
                    ctx.update_history(mv, bonus);
                }

                return (beta, Some(mv));
            }
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    // TT SAVE WITH MATE SCORE ADJUSTMENT (Best Score)
    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(
        hash,
        best_move,
        tt_score,
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    (best_score, best_move)
}

/// Runs iterative deepening from the current position, using and refreshing
/// `tt` across calls (the caller owns the table's lifetime across searches,
/// e.g. a whole UCI game or a single ad hoc test search).
pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    search_with_interrupt(
        board,
        tables,
        tt,
        max_depth,
        time_limit,
        Arc::new(AtomicBool::new(false)),
    )
}

pub fn search_with_interrupt(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
    interrupt: Interrupt,
) -> (i32, Option<Move>) {
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    tt.new_search();
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::with_interrupt(time_limit, interrupt);
    let mut last_iter_duration = Duration::from_millis(0);

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        // --- ITERATIVE DEEPENING SAFETY CHECK ---
        // Predict if we can afford the next depth before starting it.
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            if total_elapsed + predicted_next > limit {
                break;
            }
        }
        if depth > 1 && time.soft_expired() {
            break;
        }
        // -----------------------------------------

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        // --- Aspiration Window Logic ---
        let mut alpha = -INF;
        let mut beta = INF;
        let window = 50; // Window size (50cp)

        // Only apply aspiration windows at depth > 4 for stability
        if depth > 4 {
            alpha = last_completed_best_score - window;
            beta = last_completed_best_score + window;
        }

        let mut score;
        let mut mv;

        loop {
            let result = alpha_beta(
                board, tables, &mut ctx, tt, depth, 0, alpha, beta, &mut nodes, &mut time,
            );

            score = result.0;
            mv = result.1;

            if time.stop_signal {
                break;
            }

            // 1. Fail Low (Score <= Alpha): widen alpha downwards only.
            if score <= alpha {
                alpha = -INF;
                continue;
            }

            // 2. Fail High (Score >= Beta): widen beta upwards only.
            if score >= beta {
                beta = INF;
                continue;
            }

            // 3. Success: Score is within the window.
            break;
        }
        // -------------------------------

        last_iter_duration = iter_start.elapsed();

        // Incomplete iteration: discard, keep the previous best move.
        if time.stop_signal {
            break;
        }

        last_completed_best_score = score;
        last_completed_best_move = mv;

        // Output info for GUI (standard UCI)
        if let Some(valid_mv) = last_completed_best_move {
            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", last_completed_best_score)
            };

            let pv = ctx.root_pv();
            let pv_str = if pv.is_empty() {
                valid_mv.to_uci()
            } else {
                pv.iter()
                    .map(|m| m.to_uci())
                    .collect::<Vec<_>>()
                    .join(" ")
            };

            println!(
                "info depth {} score {} nodes {} time {} hashfull {} pv {}",
                depth,
                score_str,
                nodes,
                time.start_time.elapsed().as_millis(),
                tt.hashfull(),
                pv_str
            );
        }

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}
