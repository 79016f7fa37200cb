use std::fmt::{Display, Formatter};

use std::io::Write;
use std::time::Instant;
use crate::misc::HashSet;

use std::sync::mpsc::{channel, Sender};
use std::thread::ThreadId;
use std::io::BufWriter;

use console::{pad_str_with, Alignment, style, pad_str};

/// Struct to hold the UI
/// Particulary the receiver channel
pub struct UI {
    sender : UISender
}


#[derive(Clone)]
pub struct UISender {
    sender : Sender<UIMessage>
}


impl UISender {
    /// Sender writing into a caller owned channel instead of a UI thread
    pub fn from_channel(sender : Sender<UIMessage>) -> Self {
        UISender { sender }
    }

    /// Send typed UIMessage to internal channel.
    /// A UI that already exited drops the message.
    pub fn send(&self, user_msg : UIUserMessage) {
        #[cfg(not(feature = "disable_ui"))]
        let _ = self.sender.send(
            UIMessage {
                thread_id: std::thread::current().id(),
                message: user_msg
            }
        );
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

impl UI {

    pub fn get_sender(&self) -> UISender {
        self.sender.clone()
    }

    pub fn new() -> Self {

        let (sender, receiver) = channel::<UIMessage>();


        #[cfg(not(feature = "disable_ui"))]
        std::thread::spawn(move || {

            #[cfg(not(feature = "locked_out"))]
                let stdout = std::io::stdout();
            #[cfg(feature = "locked_out")]
                let stdout = std::io::stdout().lock();

            #[cfg(not(feature = "buffered_out"))]
                let mut buffered_out = stdout;
            #[cfg(feature = "buffered_out")]
                let mut buffered_out = BufWriter::with_capacity(512, stdout);

            let start_time = Instant::now();

            let mut total_heuristic_runtime = 0.0;
            let mut total_sub_solve_nodes = 0;

            let mut heuristics_this_phase = HashSet::default();

            // every sender dropped ends the ui as well
            while let Ok(UIMessage { thread_id, message }) = receiver.recv() {
                match message {
                    UIUserMessage::Log(msg) => writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {}", thread_id, start_time.elapsed().as_secs_f64(), msg).unwrap(),
                    UIUserMessage::LogS(msg) => writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {}", thread_id, start_time.elapsed().as_secs_f64(), msg).unwrap(),

                    UIUserMessage::StartPhase(title) => {
                        heuristics_this_phase = HashSet::default();

                        writeln!(&mut buffered_out, "{}", pad_str_with(&format!("{:?}", thread_id), 30, Alignment::Center, None, '⎯')).unwrap();
                        writeln!(&mut buffered_out, "{}", style(pad_str(title, 30, Alignment::Center, None)).green()).unwrap();
                        writeln!(&mut buffered_out, "{}", "⎯".repeat(30)).unwrap();
                        buffered_out.flush().unwrap();
                    }

                    UIUserMessage::HeuristicStart { name, depth } => {
                        writeln!(&mut buffered_out, "[{t:?}] {time:>6.2} started   {name} at depth {depth}",
                                 t = thread_id,
                                 time = start_time.elapsed().as_secs_f64(),
                        ).unwrap();
                        heuristics_this_phase.insert(name);
                    }

                    UIUserMessage::HeuristicFinish(state) => {
                        total_heuristic_runtime += state.runtime;

                        writeln!(&mut buffered_out, "[{t:?}] {time:>6.2} completed {state}",
                                 t = thread_id,
                                 time = start_time.elapsed().as_secs_f64(),
                        ).unwrap();
                    }

                    UIUserMessage::HeuristicDisabled { name, reason } => {
                        writeln!(&mut buffered_out, "{}", style(format!("{name} switched off: {reason}")).yellow().bold()).unwrap();
                    }

                    UIUserMessage::SubSolveFinish(state) => {
                        total_sub_solve_nodes += state.nodes;

                        /* noisy */
                        writeln!(&mut buffered_out, "{}", style(format!("[{t:?}] {time:>6.2} sub-solve {state}",
                                 t = thread_id,
                                 time = start_time.elapsed().as_secs_f64(),
                        )).dim()).unwrap();
                    }

                    UIUserMessage::NewBest { obj, heuristic } => {
                        writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {} {} {}", thread_id, start_time.elapsed().as_secs_f64(), style("Has new best:").black().on_green().bold(), style(obj.to_string()).bold(), style(format!("({heuristic})")).dim()).unwrap();
                        buffered_out.flush().unwrap();
                    }

                    UIUserMessage::ExitUi { stats } => {
                        writeln!(&mut buffered_out, "{}", pad_str_with("Statistics", 30, Alignment::Center, None, '⎯')).unwrap();
                        writeln!(&mut buffered_out, "total_heuristic_time: {:>8.2}s / sub_solve_nodes: {} / active: {}", total_heuristic_runtime, total_sub_solve_nodes, heuristics_this_phase.len()).unwrap();
                        for stat in stats {
                            writeln!(&mut buffered_out, "{stat}").unwrap();
                        }
                        writeln!(&mut buffered_out, "{}", "⎯".repeat(30)).unwrap();

                        buffered_out.flush().unwrap();

                        break
                    }
                }
            }

            buffered_out.flush().unwrap();
        });


        Self {
            sender : UISender { sender }
        }

    }
}

#[derive(Clone)]
pub struct HeuristicUIState {
    pub name : String,
    pub depth : u32,
    pub outcome : &'static str,
    pub objective : Option<f64>,
    pub best_obj : f64,
    pub runtime : f64
}

impl Display for HeuristicUIState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{name} depth=<{depth}> outcome=<{outcome}> obj=<{obj}> obj*=<{best_obj}> runtime=<{runtime:>5.2}>",
            name = self.name, depth = self.depth, outcome = self.outcome,
            obj = self.objective.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string()), best_obj = self.best_obj, runtime = self.runtime
        )
    }
}

#[derive(Clone)]
pub struct SubSolveUIState {
    pub label : String,
    pub columns : usize,
    pub rows : usize,
    pub nodes : usize,
    pub status : i32,
    pub objective : Option<f64>,
    pub runtime : f64
}

impl Display for SubSolveUIState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cols=<{}> rows=<{}> nodes=<{}> status=<{}> obj=<{}> runtime=<{:>5.2}>", self.label, self.columns, self.rows, self.nodes, self.status, self.objective.map(|v| format!("{:>10.6}", v)).unwrap_or("-".to_string()), self.runtime)
    }
}

#[derive(Clone)]
pub struct HeuristicStatsUIState {
    pub name : String,
    pub runs : usize,
    pub solutions : usize,
    pub sub_solve_nodes : usize,
    pub runtime : f64
}

impl Display for HeuristicStatsUIState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<12} runs=<{}> solutions=<{}> sub_nodes=<{}> runtime=<{:>5.2}>", self.name, self.runs, self.solutions, self.sub_solve_nodes, self.runtime)
    }
}

#[derive(Clone)]
/// Holds all state updates that can influence the UI
pub enum UIUserMessage {
    LogS( &'static str),
    Log( String),
    StartPhase(&'static str),
    ExitUi { stats : Vec<HeuristicStatsUIState> },

    HeuristicStart { name : String, depth : u32 },
    HeuristicFinish(HeuristicUIState),
    HeuristicDisabled { name : String, reason : &'static str },
    SubSolveFinish(SubSolveUIState),

    NewBest { obj : f64, heuristic : String }
}


#[derive(Clone)]
pub struct UIMessage {
    pub thread_id : ThreadId,
    pub message : UIUserMessage
}
