//! 动画播放计时器

use std::time::Instant;

/// 循环播放计时器
///
/// 时间在 [t_min, t_max] 内推进，到达 t_max 后回到 t_min。
#[derive(Clone, Debug)]
pub struct AnimationTimer {
    /// 当前动画时间
    pub t: f32,
    pub t_min: f32,
    pub t_max: f32,
    /// 播放速度倍率
    pub scale: f32,
    paused: bool,
    last_update_time: Option<Instant>,
}

impl Default for AnimationTimer {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl AnimationTimer {
    pub fn new(t_min: f32, t_max: f32) -> Self {
        Self {
            t: t_min,
            t_min,
            t_max,
            scale: 1.0,
            paused: false,
            last_update_time: None,
        }
    }

    /// 设置播放区间并回到起点
    pub fn set_range(&mut self, t_min: f32, t_max: f32) {
        self.t_min = t_min;
        self.t_max = t_max;
        self.t = t_min;
        self.last_update_time = None;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.last_update_time = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 按真实经过时间推进，返回缩放后的 dt
    ///
    /// 首次调用只记录起始时刻，返回 0。
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = self
            .last_update_time
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_update_time = Some(now);
        self.advance(elapsed)
    }

    /// 推进 elapsed 秒（真实时间），返回缩放后的 dt
    pub fn advance(&mut self, elapsed: f32) -> f32 {
        if self.paused || !elapsed.is_finite() || elapsed <= 0.0 {
            return 0.0;
        }
        let dt = elapsed * self.scale;
        self.t += dt;

        let range = self.t_max - self.t_min;
        if range <= 0.0 {
            self.t = self.t_min;
        } else if self.t > self.t_max {
            self.t = self.t_min + (self.t - self.t_min).rem_euclid(range);
        }
        dt
    }
}
