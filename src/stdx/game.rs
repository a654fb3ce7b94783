//=============================================
// nekoscript/stdx/game.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: 2D game capability module
// Objective: Software canvas with shapes, text and sprites, axis-aligned
//            collisions, a fixed-timestep update loop and PPM snapshots
//=============================================

use super::{ModuleBuilder, map_of};
use crate::interpreter::{
    Bindings, HostTask, Interpreter, NativeArity, RuntimeError, TaskStatus, Value, arg,
    expect_callable, expect_number, expect_text,
};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

type Rgb = [u8; 3];

const DEFAULT_SPRITE_SIZE: f64 = 32.0;
const MAX_CATCH_UP_TICKS: u32 = 5;
const MAX_DIMENSION: usize = 8192;
const BLACK: Rgb = [0, 0, 0];
const WHITE: Rgb = [255, 255, 255];

pub fn create_module(interpreter: &mut Interpreter) -> Result<Bindings, RuntimeError> {
    let game = interpreter.config().game.clone();
    let tick = Duration::from_secs_f64(1.0 / game.ticks_per_second.max(1) as f64);
    let max_immediate_frames = game.max_immediate_frames;

    let mut builder = ModuleBuilder::new("Game");
    builder
        .function("creerJeu", NativeArity::between(2, 3), move |_, args| {
            let width = expect_number(&arg(args, 0), "creerJeu")?;
            let height = expect_number(&arg(args, 1), "creerJeu")?;
            let limit = MAX_DIMENSION as f64;
            if !(1.0..=limit).contains(&width) || !(1.0..=limit).contains(&height) {
                return Err(RuntimeError::ArgumentError(format!(
                    "creerJeu : dimensions invalides {width}x{height}"
                )));
            }
            let title = match arg(args, 2) {
                Value::Null => "NekoJeu".to_string(),
                value => value.to_string(),
            };
            let canvas = Canvas::new(width as usize, height as usize, title, tick, max_immediate_frames);
            Ok(canvas_value(Rc::new(RefCell::new(canvas))))
        })
        .function("couleur", NativeArity::Exact(3), |_, args| {
            let channel = |index: usize| -> Result<u8, RuntimeError> {
                Ok(expect_number(&arg(args, index), "couleur")?.clamp(0.0, 255.0) as u8)
            };
            Ok(Value::text(hex_color([channel(0)?, channel(1)?, channel(2)?])))
        });
    Ok(builder.build())
}

//=============================================
//            Section 1: Colors & Images
//=============================================

fn parse_color(value: &Value, default: Rgb) -> Result<Rgb, RuntimeError> {
    let text = match value {
        Value::Null => return Ok(default),
        Value::Map(map) => {
            let channel = |key: &str| {
                map.get(key)
                    .and_then(Value::to_number)
                    .unwrap_or_default()
                    .clamp(0.0, 255.0) as u8
            };
            return Ok([channel("r"), channel("g"), channel("b")]);
        }
        other => other.to_string(),
    };

    let lowered = text.trim().to_lowercase();
    if let Some(hex) = lowered.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RuntimeError::TypeError(format!("couleur invalide '{text}'")));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(RuntimeError::TypeError(format!("couleur invalide '{text}'"))),
        };
        let channel = |index: usize| {
            u8::from_str_radix(&expanded[index..index + 2], 16)
                .map_err(|_| RuntimeError::TypeError(format!("couleur invalide '{text}'")))
        };
        return Ok([channel(0)?, channel(2)?, channel(4)?]);
    }

    let named = match lowered.as_str() {
        "noir" | "black" => BLACK,
        "blanc" | "white" => WHITE,
        "rouge" | "red" => [255, 0, 0],
        "vert" | "green" => [0, 255, 0],
        "bleu" | "blue" => [0, 0, 255],
        "jaune" | "yellow" => [255, 255, 0],
        "cyan" => [0, 255, 255],
        "magenta" => [255, 0, 255],
        "gris" | "gray" | "grey" => [128, 128, 128],
        "orange" => [255, 165, 0],
        "violet" | "purple" => [128, 0, 128],
        "rose" | "pink" => [255, 192, 203],
        _ => return Err(RuntimeError::TypeError(format!("couleur inconnue '{text}'"))),
    };
    Ok(named)
}

fn hex_color([r, g, b]: Rgb) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[derive(Debug, Error, PartialEq)]
pub enum PpmError {
    #[error("en-tête PPM invalide")]
    Header,
    #[error("format PPM non pris en charge : {0}")]
    Unsupported(String),
    #[error("données PPM tronquées")]
    Truncated,
    #[error("dimensions PPM trop grandes : {0}x{1}")]
    TooLarge(usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgb>,
}

/// Decode a binary (P6) PPM with an 8-bit max value.
pub fn decode_ppm(bytes: &[u8]) -> Result<Image, PpmError> {
    let mut cursor = 0;
    let mut fields = Vec::with_capacity(4);
    while fields.len() < 4 {
        while cursor < bytes.len() && (bytes[cursor].is_ascii_whitespace() || bytes[cursor] == b'#') {
            if bytes[cursor] == b'#' {
                while cursor < bytes.len() && bytes[cursor] != b'\n' {
                    cursor += 1;
                }
            } else {
                cursor += 1;
            }
        }
        let start = cursor;
        while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if start == cursor {
            return Err(PpmError::Header);
        }
        fields.push(String::from_utf8_lossy(&bytes[start..cursor]).into_owned());
    }
    // Exactly one whitespace byte separates the header from the raster.
    cursor += 1;

    if fields[0] != "P6" {
        return Err(PpmError::Unsupported(fields[0].clone()));
    }
    let parse = |field: &str| field.parse::<usize>().map_err(|_| PpmError::Header);
    let (width, height, max) = (parse(&fields[1])?, parse(&fields[2])?, parse(&fields[3])?);
    if max != 255 {
        return Err(PpmError::Unsupported(format!("valeur maximale {max}")));
    }

    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(PpmError::TooLarge(width, height));
    }

    let expected = width * height * 3;
    let raster = cursor
        .checked_add(expected)
        .and_then(|end| bytes.get(cursor..end))
        .ok_or(PpmError::Truncated)?;
    Ok(Image {
        width,
        height,
        pixels: raster.chunks_exact(3).map(|px| [px[0], px[1], px[2]]).collect(),
    })
}

pub fn encode_ppm(width: usize, height: usize, pixels: &[Rgb]) -> Vec<u8> {
    let mut out = format!("P6\n{width} {height}\n255\n").into_bytes();
    out.reserve(pixels.len() * 3);
    for pixel in pixels {
        out.extend_from_slice(pixel);
    }
    out
}

//=============================================
//            Section 2: Canvas & Sprites
//=============================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rect {
    fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    fn from_value(value: &Value, canvas: &Canvas) -> Result<Rect, RuntimeError> {
        let Value::Map(map) = value else {
            return Err(RuntimeError::TypeError(format!(
                "collision attend des sprites ou des rectangles, reçu {}",
                value.type_name()
            )));
        };
        if let Some(sprite) = map
            .get("id")
            .and_then(Value::to_number)
            .and_then(|id| canvas.sprite(id as u64))
        {
            return Ok(sprite.borrow().rect());
        }
        let field = |key: &str| map.get(key).and_then(Value::to_number).unwrap_or_default();
        Ok(Rect {
            x: field("x"),
            y: field("y"),
            width: field("largeur"),
            height: field("hauteur"),
        })
    }
}

#[derive(Debug)]
struct Sprite {
    id: u64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    vx: f64,
    vy: f64,
    color: Rgb,
    image: Option<Image>,
}

impl Sprite {
    fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

type SharedSprite = Rc<RefCell<Sprite>>;

struct Canvas {
    width: usize,
    height: usize,
    title: String,
    pixels: Vec<Rgb>,
    texts: Vec<String>,
    sprites: Vec<SharedSprite>,
    next_sprite: u64,
    update: Option<Value>,
    tick: Duration,
    max_immediate_frames: u32,
    frames: u64,
    running: bool,
    paused: bool,
    stop_requested: bool,
}

type SharedCanvas = Rc<RefCell<Canvas>>;

impl Canvas {
    fn new(width: usize, height: usize, title: String, tick: Duration, max_immediate_frames: u32) -> Self {
        Self {
            width,
            height,
            title,
            pixels: vec![BLACK; width * height],
            texts: Vec::new(),
            sprites: Vec::new(),
            next_sprite: 0,
            update: None,
            tick,
            max_immediate_frames,
            frames: 0,
            running: false,
            paused: false,
            stop_requested: false,
        }
    }

    fn sprite(&self, id: u64) -> Option<SharedSprite> {
        self.sprites.iter().find(|s| s.borrow().id == id).cloned()
    }

    fn fill_rect(pixels: &mut [Rgb], width: usize, height: usize, rect: Rect, color: Rgb) {
        let x0 = rect.x.max(0.0).floor() as usize;
        let y0 = rect.y.max(0.0).floor() as usize;
        let x1 = ((rect.x + rect.width).ceil().max(0.0) as usize).min(width);
        let y1 = ((rect.y + rect.height).ceil().max(0.0) as usize).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                pixels[y * width + x] = color;
            }
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb) {
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(self.height);
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(self.width);
        for y in y0..y1 {
            for x in x0..x1 {
                let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
                if dx * dx + dy * dy <= radius * radius {
                    self.pixels[y * self.width + x] = color;
                }
            }
        }
    }

    /// Drawn surface with every sprite composited on top.
    fn composite(&self) -> Vec<Rgb> {
        let mut frame = self.pixels.clone();
        for sprite in &self.sprites {
            let sprite = sprite.borrow();
            match &sprite.image {
                Some(image) => {
                    for (row, line) in image.pixels.chunks(image.width.max(1)).enumerate() {
                        for (col, pixel) in line.iter().enumerate() {
                            let x = sprite.x.floor() + col as f64;
                            let y = sprite.y.floor() + row as f64;
                            if x >= 0.0 && y >= 0.0 && (x as usize) < self.width && (y as usize) < self.height {
                                frame[y as usize * self.width + x as usize] = *pixel;
                            }
                        }
                    }
                }
                None => Self::fill_rect(&mut frame, self.width, self.height, sprite.rect(), sprite.color),
            }
        }
        frame
    }

    fn advance_sprites(&self) {
        let dt = self.tick.as_secs_f64();
        for sprite in &self.sprites {
            let mut sprite = sprite.borrow_mut();
            sprite.x += sprite.vx * dt;
            sprite.y += sprite.vy * dt;
        }
    }
}

/// One fixed-timestep tick: move sprites, then run the update callback.
fn run_tick(interpreter: &mut Interpreter, canvas: &SharedCanvas) -> Result<(), RuntimeError> {
    let (update, dt, frame) = {
        let mut state = canvas.borrow_mut();
        if state.paused {
            return Ok(());
        }
        state.advance_sprites();
        state.frames += 1;
        (state.update.clone(), state.tick.as_secs_f64(), state.frames)
    };
    if let Some(update) = update {
        interpreter.call_value(&update, vec![Value::Number(dt), Value::Number(frame as f64)])?;
    }
    Ok(())
}

//=============================================
//            Section 3: Script Bindings
//=============================================

fn canvas_value(canvas: SharedCanvas) -> Value {
    let (width, height) = {
        let state = canvas.borrow();
        (state.width, state.height)
    };
    let mut entries: Vec<(&str, Value)> = vec![
        ("largeur", Value::Number(width as f64)),
        ("hauteur", Value::Number(height as f64)),
    ];

    let state = Rc::clone(&canvas);
    entries.push((
        "effacer",
        Value::native("effacer", NativeArity::between(0, 1), move |_, args| {
            let color = parse_color(&arg(args, 0), BLACK)?;
            let mut canvas = state.borrow_mut();
            canvas.pixels.fill(color);
            canvas.texts.clear();
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "rectangle",
        Value::native("rectangle", NativeArity::between(4, 5), move |_, args| {
            let rect = Rect {
                x: expect_number(&arg(args, 0), "rectangle")?,
                y: expect_number(&arg(args, 1), "rectangle")?,
                width: expect_number(&arg(args, 2), "rectangle")?,
                height: expect_number(&arg(args, 3), "rectangle")?,
            };
            let color = parse_color(&arg(args, 4), WHITE)?;
            let mut canvas = state.borrow_mut();
            let (width, height) = (canvas.width, canvas.height);
            Canvas::fill_rect(&mut canvas.pixels, width, height, rect, color);
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "cercle",
        Value::native("cercle", NativeArity::between(3, 4), move |_, args| {
            let x = expect_number(&arg(args, 0), "cercle")?;
            let y = expect_number(&arg(args, 1), "cercle")?;
            let radius = expect_number(&arg(args, 2), "cercle")?;
            let color = parse_color(&arg(args, 3), WHITE)?;
            state.borrow_mut().fill_circle(x, y, radius, color);
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "texte",
        Value::native("texte", NativeArity::between(3, 4), move |_, args| {
            let content = arg(args, 0).to_string();
            let x = expect_number(&arg(args, 1), "texte")?;
            let y = expect_number(&arg(args, 2), "texte")?;
            parse_color(&arg(args, 3), WHITE)?;
            tracing::debug!(%content, x, y, "text drawn");
            state.borrow_mut().texts.push(content);
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "textes",
        Value::native("textes", NativeArity::Exact(0), move |_, _| {
            Ok(Value::List(state.borrow().texts.iter().map(Value::text).collect()))
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "sprite",
        Value::native("sprite", NativeArity::between(2, 5), move |_, args| {
            create_sprite(&state, args)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "collision",
        Value::native("collision", NativeArity::Exact(2), move |_, args| {
            let canvas = state.borrow();
            let a = Rect::from_value(&arg(args, 0), &canvas)?;
            let b = Rect::from_value(&arg(args, 1), &canvas)?;
            Ok(Value::Bool(a.intersects(&b)))
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "pixel",
        Value::native("pixel", NativeArity::Exact(2), move |_, args| {
            let x = expect_number(&arg(args, 0), "pixel")?;
            let y = expect_number(&arg(args, 1), "pixel")?;
            let canvas = state.borrow();
            if x < 0.0 || y < 0.0 || x as usize >= canvas.width || y as usize >= canvas.height {
                return Err(RuntimeError::IndexError(format!(
                    "pixel ({x}, {y}) hors du canevas {}x{}",
                    canvas.width, canvas.height
                )));
            }
            let frame = canvas.composite();
            Ok(Value::text(hex_color(frame[y as usize * canvas.width + x as usize])))
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "sauvegarder",
        Value::native("sauvegarder", NativeArity::Exact(1), move |_, args| {
            let path = expect_text(&arg(args, 0), "sauvegarder")?;
            let canvas = state.borrow();
            let bytes = encode_ppm(canvas.width, canvas.height, &canvas.composite());
            std::fs::write(&path, bytes)?;
            tracing::debug!(%path, "canvas snapshot written");
            Ok(Value::Bool(true))
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "images",
        Value::native("images", NativeArity::Exact(0), move |_, _| {
            Ok(Value::Number(state.borrow().frames as f64))
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "pause",
        Value::native("pause", NativeArity::Exact(0), move |_, _| {
            state.borrow_mut().paused = true;
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "reprendre",
        Value::native("reprendre", NativeArity::Exact(0), move |_, _| {
            state.borrow_mut().paused = false;
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "arreter",
        Value::native("arreter", NativeArity::Exact(0), move |_, _| {
            state.borrow_mut().stop_requested = true;
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&canvas);
    entries.push((
        "demarrer",
        Value::native("demarrer", NativeArity::between(0, 1), move |interpreter, args| {
            let update = match args.first() {
                Some(Value::Null) | None => None,
                Some(value) => Some(expect_callable(value, "demarrer")?),
            };
            start_loop(interpreter, &state, update)
        }),
    ));

    map_of(entries)
}

fn create_sprite(canvas: &SharedCanvas, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = expect_number(&arg(args, 0), "sprite")?;
    let y = expect_number(&arg(args, 1), "sprite")?;
    let mut width = match arg(args, 2) {
        Value::Null => None,
        value => Some(expect_number(&value, "sprite")?),
    };
    let mut height = match arg(args, 3) {
        Value::Null => None,
        value => Some(expect_number(&value, "sprite")?),
    };

    let mut color = WHITE;
    let mut image = None;
    match arg(args, 4) {
        Value::Null => {}
        Value::Str(text) if text.to_lowercase().ends_with(".ppm") => match load_image(Path::new(&text)) {
            Ok(loaded) => {
                width.get_or_insert(loaded.width as f64);
                height.get_or_insert(loaded.height as f64);
                image = Some(loaded);
            }
            Err(error) => {
                tracing::warn!(path = %text, %error, "sprite image unavailable, drawing a solid rectangle");
            }
        },
        other => color = parse_color(&other, WHITE)?,
    }

    let sprite = {
        let mut state = canvas.borrow_mut();
        state.next_sprite += 1;
        let sprite = Rc::new(RefCell::new(Sprite {
            id: state.next_sprite,
            x,
            y,
            width: width.unwrap_or(DEFAULT_SPRITE_SIZE),
            height: height.unwrap_or(DEFAULT_SPRITE_SIZE),
            vx: 0.0,
            vy: 0.0,
            color,
            image,
        }));
        state.sprites.push(Rc::clone(&sprite));
        sprite
    };
    Ok(sprite_value(canvas, sprite))
}

fn load_image(path: &Path) -> Result<Image, RuntimeError> {
    let bytes = std::fs::read(path)?;
    decode_ppm(&bytes).map_err(|error| RuntimeError::Io(error.to_string()))
}

fn point(x: f64, y: f64) -> Value {
    map_of([("x", Value::Number(x)), ("y", Value::Number(y))])
}

fn sprite_value(canvas: &SharedCanvas, sprite: SharedSprite) -> Value {
    let id = sprite.borrow().id;
    let mut entries: Vec<(&str, Value)> = vec![("id", Value::Number(id as f64))];

    let state = Rc::clone(&sprite);
    entries.push((
        "deplacer",
        Value::native("deplacer", NativeArity::Exact(2), move |_, args| {
            let dx = expect_number(&arg(args, 0), "deplacer")?;
            let dy = expect_number(&arg(args, 1), "deplacer")?;
            let mut sprite = state.borrow_mut();
            sprite.x += dx;
            sprite.y += dy;
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&sprite);
    entries.push((
        "positionner",
        Value::native("positionner", NativeArity::Exact(2), move |_, args| {
            let x = expect_number(&arg(args, 0), "positionner")?;
            let y = expect_number(&arg(args, 1), "positionner")?;
            let mut sprite = state.borrow_mut();
            sprite.x = x;
            sprite.y = y;
            Ok(Value::Null)
        }),
    ));

    let state = Rc::clone(&sprite);
    entries.push((
        "position",
        Value::native("position", NativeArity::Exact(0), move |_, _| {
            let sprite = state.borrow();
            Ok(point(sprite.x, sprite.y))
        }),
    ));

    let state = Rc::clone(&sprite);
    entries.push((
        "vitesse",
        Value::native("vitesse", NativeArity::Exact(0), move |_, _| {
            let sprite = state.borrow();
            Ok(point(sprite.vx, sprite.vy))
        }),
    ));

    let state = Rc::clone(&sprite);
    entries.push((
        "definirVitesse",
        Value::native("definirVitesse", NativeArity::Exact(2), move |_, args| {
            let vx = expect_number(&arg(args, 0), "definirVitesse")?;
            let vy = expect_number(&arg(args, 1), "definirVitesse")?;
            let mut sprite = state.borrow_mut();
            sprite.vx = vx;
            sprite.vy = vy;
            Ok(Value::Null)
        }),
    ));

    // Touch checks against another sprite handle or a plain rectangle map.
    let state = Rc::clone(&sprite);
    let owner = Rc::clone(canvas);
    entries.push((
        "touche",
        Value::native("touche", NativeArity::Exact(1), move |_, args| {
            let canvas = owner.borrow();
            let other = Rect::from_value(&arg(args, 0), &canvas)?;
            Ok(Value::Bool(state.borrow().rect().intersects(&other)))
        }),
    ));

    map_of(entries)
}

fn start_loop(
    interpreter: &mut Interpreter,
    canvas: &SharedCanvas,
    update: Option<Value>,
) -> Result<Value, RuntimeError> {
    {
        let mut state = canvas.borrow_mut();
        if state.running {
            return Ok(Value::Null);
        }
        state.update = update;
        state.running = true;
        state.stop_requested = false;
    }

    if interpreter.is_persistent() {
        let (title, tick) = {
            let state = canvas.borrow();
            (state.title.clone(), state.tick)
        };
        tracing::info!(%title, tick_ms = tick.as_millis() as u64, "game loop started");
        interpreter.print_line(format!("Jeu « {title} » démarré"));
        interpreter.register_task(Box::new(GameTask {
            canvas: Rc::clone(canvas),
            last_tick: Instant::now(),
        }));
        return Ok(Value::Null);
    }

    let max_frames = canvas.borrow().max_immediate_frames;
    let mut simulated = 0;
    while simulated < max_frames {
        {
            let state = canvas.borrow();
            if state.stop_requested || state.paused {
                break;
            }
        }
        run_tick(interpreter, canvas)?;
        simulated += 1;
    }

    let mut state = canvas.borrow_mut();
    state.running = false;
    let title = state.title.clone();
    let frames = state.frames;
    drop(state);
    if simulated >= max_frames {
        interpreter.print_line(format!(
            "Jeu « {title} » simulé sur {frames} images (utilisez `neko demarrer` pour le garder actif)"
        ));
    } else {
        interpreter.print_line(format!("Jeu « {title} » arrêté après {frames} images"));
    }
    Ok(Value::Null)
}

//=============================================
//            Section 4: Game Host Task
//=============================================

struct GameTask {
    canvas: SharedCanvas,
    last_tick: Instant,
}

impl HostTask for GameTask {
    fn name(&self) -> &str {
        "boucle-de-jeu"
    }

    fn poll(&mut self, interpreter: &mut Interpreter) -> Result<TaskStatus, RuntimeError> {
        let tick = {
            let state = self.canvas.borrow();
            if state.stop_requested {
                return Ok(TaskStatus::Done);
            }
            state.tick
        };

        let mut due = 0;
        while self.last_tick.elapsed() >= tick && due < MAX_CATCH_UP_TICKS {
            self.last_tick += tick;
            due += 1;
        }
        if due == MAX_CATCH_UP_TICKS {
            // Too far behind; drop the backlog rather than spiral.
            self.last_tick = Instant::now();
        }
        for _ in 0..due {
            run_tick(interpreter, &self.canvas)?;
            if self.canvas.borrow().stop_requested {
                return Ok(TaskStatus::Done);
            }
        }
        Ok(TaskStatus::Pending)
    }

    fn shutdown(&mut self, _: &mut Interpreter) {
        let mut state = self.canvas.borrow_mut();
        state.running = false;
        tracing::info!(title = %state.title, frames = state.frames, "game loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_names_and_hex() {
        assert_eq!(parse_color(&Value::text("rouge"), BLACK).expect("rouge"), [255, 0, 0]);
        assert_eq!(parse_color(&Value::text("#0f0"), BLACK).expect("hex"), [0, 255, 0]);
        assert_eq!(parse_color(&Value::text("#1a2b3c"), BLACK).expect("hex"), [0x1a, 0x2b, 0x3c]);
        assert_eq!(parse_color(&Value::Null, WHITE).expect("default"), WHITE);
        assert!(parse_color(&Value::text("plaid"), BLACK).is_err());
    }

    #[test]
    fn non_ascii_hex_colors_are_rejected() {
        for text in ["#€", "#é1", "#ab€12"] {
            assert!(
                matches!(parse_color(&Value::text(text), BLACK), Err(RuntimeError::TypeError(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn ppm_round_trip_keeps_pixels() {
        let pixels = vec![[1, 2, 3], [4, 5, 6]];
        let bytes = encode_ppm(2, 1, &pixels);
        let image = decode_ppm(&bytes).expect("decode");
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, pixels);
    }

    #[test]
    fn ppm_header_comments_and_errors() {
        let mut bytes = b"P6\n# commentaire\n1 1\n255\n".to_vec();
        bytes.extend_from_slice(&[9, 8, 7]);
        assert_eq!(decode_ppm(&bytes).expect("decode").pixels, vec![[9, 8, 7]]);

        assert_eq!(decode_ppm(b"P3\n1 1\n255\n0 0 0"), Err(PpmError::Unsupported("P3".into())));
        assert_eq!(decode_ppm(b"P6\n2 2\n255\n\x00"), Err(PpmError::Truncated));
    }

    #[test]
    fn ppm_dimensions_are_bounded() {
        assert_eq!(
            decode_ppm(b"P6\n4294967296 4294967296\n255\n\x00\x00\x00"),
            Err(PpmError::TooLarge(4_294_967_296, 4_294_967_296))
        );
        assert_eq!(decode_ppm(b"P6\n8193 1\n255\n"), Err(PpmError::TooLarge(8193, 1)));
    }

    #[test]
    fn rectangles_intersect_only_when_overlapping() {
        let a = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = Rect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        let c = Rect { x: 10.0, y: 0.0, width: 5.0, height: 5.0 };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn sprites_move_with_velocity_each_tick() {
        let canvas = Rc::new(RefCell::new(Canvas::new(
            100,
            100,
            "test".into(),
            Duration::from_millis(100),
            10,
        )));
        let sprite = create_sprite(&canvas, &[Value::Number(0.0), Value::Number(0.0)]).expect("sprite");
        let sprite = sprite.as_map().expect("map").clone();
        let mut interpreter = Interpreter::new();
        let set = sprite.get("definirVitesse").expect("definirVitesse").clone();
        interpreter
            .call_value(&set, vec![Value::Number(10.0), Value::Number(0.0)])
            .expect("velocity");

        start_loop(&mut interpreter, &canvas, None).expect("loop");
        let position = sprite.get("position").expect("position").clone();
        let position = interpreter.call_value(&position, Vec::new()).expect("position");
        let x = position.as_map().and_then(|p| p.get("x")).and_then(Value::to_number);
        assert!((x.expect("x") - 10.0).abs() < 1e-9);
        assert_eq!(canvas.borrow().frames, 10);
    }
}
